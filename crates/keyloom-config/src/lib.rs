#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for Keyloom.
//!
//! # Usage
//!
//! ```rust,no_run
//! use keyloom_config::Config;
//!
//! // defaults → user file → explicit file → KEYLOOM_* environment
//! let resolved = Config::load(None).unwrap();
//! println!("fast namespace: {}", resolved.config.fast.namespace);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`KEYLOOM_FAST_NAMESPACE`, `KEYLOOM_DATA_DIR`,
//!    `KEYLOOM_SECURE_ALLOW_LIST`, `KEYLOOM_LOG_LEVEL`)
//! 2. **Explicit file** passed with `--config`
//! 3. **User** (`<config dir>/keyloom/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other Keyloom crate. Conversion into storage
//! types happens in the CLI.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layer merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigResult};
pub use loader::{LoadOptions, ResolvedConfig};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the
    /// final configuration fails validation.
    pub fn load(explicit_file: Option<&Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit_file)
    }

    /// The configured data directory, or the platform default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoDataDir`] if neither is available.
    pub fn data_dir(&self) -> ConfigResult<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => loader::default_data_dir(),
        }
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError {
            field: "<root>".to_owned(),
            message: e.to_string(),
        })
    }
}
