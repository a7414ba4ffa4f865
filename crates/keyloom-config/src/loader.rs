//! Config file discovery and layered loading.
//!
//! Precedence, lowest first:
//! 1. Embedded `defaults.toml`
//! 2. User config (`<config dir>/keyloom/config.toml`)
//! 3. Explicit file (`--config`)
//! 4. `KEYLOOM_*` environment variables
//!
//! The merged tree is deserialized into [`Config`] and validated.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration plus where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Files merged, lowest precedence first.
    pub loaded_files: Vec<String>,
    /// Environment variables that overrode file values.
    pub env_overrides: Vec<String>,
}

/// Inputs to [`load_with`], separated from the process so tests control them.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// User config file. `None` skips the user layer.
    pub user_file: Option<PathBuf>,
    /// Explicit config file. Unlike the user file, it must exist.
    pub explicit_file: Option<PathBuf>,
    /// Environment variables to apply.
    pub env_vars: HashMap<String, String>,
}

/// Load configuration from the standard locations and the environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any file is unreadable or malformed, or if
/// the merged configuration fails validation.
pub fn load(explicit_file: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with(LoadOptions {
        user_file: user_config_path(),
        explicit_file: explicit_file.map(Path::to_path_buf),
        env_vars: collect_env_vars(),
    })
}

/// Load configuration from explicit inputs.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any file is unreadable or malformed, or if
/// the merged configuration fails validation.
pub fn load_with(options: LoadOptions) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut loaded_files = Vec::new();

    if let Some(path) = &options.user_file {
        if let Some(overlay) = try_load_file(path)? {
            deep_merge(&mut merged, &overlay);
            loaded_files.push(path.display().to_string());
            info!(path = %path.display(), "loaded user config");
        }
    }

    if let Some(path) = &options.explicit_file {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge(&mut merged, &overlay);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded explicit config");
    }

    let env_overrides: Vec<String> = apply_env_overrides(&mut merged, &options.env_vars)
        .into_iter()
        .map(str::to_owned)
        .collect();
    if !env_overrides.is_empty() {
        debug!(count = env_overrides.len(), "applied environment overrides");
    }

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
        env_overrides,
    })
}

/// Load a single file with no layering, defaults, or environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if it doesn't exist.
///
/// Reads at most one byte past the size limit, so an oversized file is
/// rejected without being loaded whole, and there is no window between a
/// metadata check and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let read_error = |source: std::io::Error| ConfigError::ReadError {
        path: path.display().to_string(),
        source,
    };
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => return Err(read_error(e)),
    };

    let mut content = String::new();
    file.take(MAX_CONFIG_FILE_SIZE.saturating_add(1))
        .read_to_string(&mut content)
        .map_err(read_error)?;

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file exceeds the {MAX_CONFIG_FILE_SIZE} byte limit"),
        });
    }

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
}

/// `<platform config dir>/keyloom/config.toml`, if a config dir exists.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("keyloom").join("config.toml"))
}

/// Platform data directory for Keyloom.
///
/// # Errors
///
/// Returns [`ConfigError::NoDataDir`] if the platform has none.
pub fn default_data_dir() -> ConfigResult<PathBuf> {
    directories::ProjectDirs::from("", "", "keyloom")
        .map(|d| d.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDir)
}
