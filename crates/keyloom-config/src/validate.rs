//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted `logging.level` values.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Accepted `logging.format` values.
pub const LOG_FORMATS: [&str; 4] = ["pretty", "compact", "json", "full"];

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

/// Validate a fully-merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_fast(config)?;
    validate_secure(config)?;
    validate_events(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_fast(config: &Config) -> ConfigResult<()> {
    let ns = &config.fast.namespace;
    if ns.is_empty() {
        return Err(invalid("fast.namespace", "namespace must not be empty"));
    }
    if ns.contains('\0') {
        return Err(invalid("fast.namespace", "namespace must not contain null bytes"));
    }
    Ok(())
}

fn validate_secure(config: &Config) -> ConfigResult<()> {
    let s = &config.secure;
    if s.service.trim().is_empty() {
        return Err(invalid("secure.service", "service name must not be empty"));
    }
    for (i, key) in s.allow_list.iter().enumerate() {
        if key.is_empty() || key.contains('\0') {
            return Err(invalid(
                &format!("secure.allow_list[{i}]"),
                "allow-list keys must be non-empty and free of null bytes",
            ));
        }
    }
    Ok(())
}

fn validate_events(config: &Config) -> ConfigResult<()> {
    if config.events.channel_capacity == 0 {
        return Err(invalid(
            "events.channel_capacity",
            "channel capacity must be at least 1",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if !LOG_FORMATS.contains(&l.format.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let mut config = Config::default();
        config.fast.namespace = String::new();
        assert_eq!(field_of(validate(&config).unwrap_err()), "fast.namespace");
    }

    #[test]
    fn test_bad_allow_list_entry_rejected() {
        let mut config = Config::default();
        config.secure.allow_list = vec!["userToken".into(), String::new()];
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "secure.allow_list[1]"
        );
    }

    #[test]
    fn test_empty_allow_list_is_allowed() {
        let mut config = Config::default();
        config.secure.allow_list.clear();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_channel_capacity_rejected() {
        let mut config = Config::default();
        config.events.channel_capacity = 0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "events.channel_capacity"
        );
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".into();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.level");

        config.logging.level = "DEBUG".into();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "xml".into();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.format");
    }
}
