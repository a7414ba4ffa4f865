//! Configuration types for Keyloom.
//!
//! All types here are self-contained with no dependencies on other Keyloom
//! crates; the CLI converts them into storage types at startup. Every
//! struct implements [`Default`] matching `defaults.toml`, so a bare
//! `[section]` header yields a working configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fast namespaced backend.
    pub fast: FastSection,
    /// Durable backend.
    pub durable: DurableSection,
    /// Secure restricted backend.
    pub secure: SecureSection,
    /// Where on-disk backends keep their files.
    pub storage: StorageSection,
    /// Change notification settings.
    pub events: EventsSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Engine behind the fast backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FastEngine {
    /// JSON file under the data directory.
    #[default]
    File,
    /// Process-local map.
    Memory,
}

/// Fast namespaced backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastSection {
    /// Key partition inside the shared physical store.
    pub namespace: String,
    /// Storage engine.
    pub engine: FastEngine,
}

impl Default for FastSection {
    fn default() -> Self {
        Self {
            namespace: "rn-dev-tools-example".to_owned(),
            engine: FastEngine::File,
        }
    }
}

/// Engine behind the durable backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurableEngine {
    /// JSON file under the data directory.
    #[default]
    File,
    /// Process-local map.
    Memory,
    /// Embedded `SurrealKV` tree under the data directory.
    Surrealkv,
}

/// Durable backend settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurableSection {
    /// Storage engine.
    pub engine: DurableEngine,
}

/// Engine behind the secure backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecureEngine {
    /// Process-local map.
    #[default]
    Memory,
    /// OS keychain.
    Keychain,
}

/// Secure restricted backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecureSection {
    /// Keychain service name.
    pub service: String,
    /// Keys the backend accepts. Everything else is a policy violation.
    pub allow_list: Vec<String>,
    /// Storage engine.
    pub engine: SecureEngine,
}

impl Default for SecureSection {
    fn default() -> Self {
        Self {
            service: "keyloom".to_owned(),
            allow_list: vec!["userToken".to_owned()],
            engine: SecureEngine::Memory,
        }
    }
}

/// On-disk locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Data directory. Falls back to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Events & logging
// ---------------------------------------------------------------------------

/// Change notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsSection {
    /// Capacity of the async change stream.
    pub channel_capacity: usize,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`).
    pub level: String,
    /// `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate directives, e.g. `["keyloom_cache=trace"]`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
