//! Environment variable overrides.
//!
//! `KEYLOOM_*` variables are the highest-precedence layer: when set, they
//! replace whatever the config files said.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

/// How a variable's text becomes a TOML value.
#[derive(Clone, Copy)]
enum Shape {
    String,
    /// Comma-separated list; blank items are dropped.
    List,
}

struct EnvMapping {
    var_name: &'static str,
    section: &'static str,
    field: &'static str,
    shape: Shape,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "KEYLOOM_FAST_NAMESPACE",
        section: "fast",
        field: "namespace",
        shape: Shape::String,
    },
    EnvMapping {
        var_name: "KEYLOOM_DATA_DIR",
        section: "storage",
        field: "data_dir",
        shape: Shape::String,
    },
    EnvMapping {
        var_name: "KEYLOOM_SECURE_ALLOW_LIST",
        section: "secure",
        field: "allow_list",
        shape: Shape::List,
    },
    EnvMapping {
        var_name: "KEYLOOM_LOG_LEVEL",
        section: "logging",
        field: "level",
        shape: Shape::String,
    },
];

/// Snapshot the process's `KEYLOOM_*` variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("KEYLOOM_"))
        .collect()
}

/// Apply every mapped variable present in `env_vars` onto `merged`.
///
/// Returns the names of the variables applied.
pub fn apply_env_overrides<S: BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> Vec<&'static str> {
    let mut applied = Vec::new();
    let Some(root) = merged.as_table_mut() else {
        return applied;
    };

    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let value = match mapping.shape {
            Shape::String => toml::Value::String(raw.clone()),
            Shape::List => toml::Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| toml::Value::String(s.to_owned()))
                    .collect(),
            ),
        };

        let section = root
            .entry(mapping.section)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        if let Some(table) = section.as_table_mut() {
            debug!(
                var = mapping.var_name,
                field = %format!("{}.{}", mapping.section, mapping.field),
                "applying env override"
            );
            table.insert(mapping.field.to_owned(), value);
            applied.push(mapping.var_name);
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_string_override_replaces_value() {
        let mut merged: toml::Value = toml::from_str("[fast]\nnamespace = \"file\"").unwrap();
        let applied = apply_env_overrides(&mut merged, &vars(&[("KEYLOOM_FAST_NAMESPACE", "env")]));
        assert_eq!(applied, vec!["KEYLOOM_FAST_NAMESPACE"]);
        assert_eq!(merged["fast"]["namespace"].as_str(), Some("env"));
    }

    #[test]
    fn test_list_override_splits_on_commas() {
        let mut merged: toml::Value = toml::from_str("").unwrap();
        apply_env_overrides(
            &mut merged,
            &vars(&[("KEYLOOM_SECURE_ALLOW_LIST", "userToken, refreshToken,,")]),
        );
        let list: Vec<&str> = merged["secure"]["allow_list"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(toml::Value::as_str)
            .collect();
        assert_eq!(list, vec!["userToken", "refreshToken"]);
    }

    #[test]
    fn test_unmapped_vars_ignored() {
        let mut merged: toml::Value = toml::from_str("").unwrap();
        let applied = apply_env_overrides(&mut merged, &vars(&[("KEYLOOM_UNKNOWN", "x")]));
        assert!(applied.is_empty());
        assert!(merged.as_table().unwrap().is_empty());
    }
}
