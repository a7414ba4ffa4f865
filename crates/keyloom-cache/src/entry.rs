//! Cache keys, entries, and statistics.

use std::fmt;

use chrono::{DateTime, Utc};
use keyloom_core::BackendId;
use serde::Serialize;

/// Identity of one cached read: `(backend, logical key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey {
    /// Backend the key lives in.
    pub backend: BackendId,
    /// Logical key.
    pub key: String,
}

impl CacheKey {
    /// Build a cache key.
    pub fn new(backend: BackendId, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }
}

/// Rendered as the request identity shown by inspection tooling,
/// e.g. `#storage/fast/demo_mmkv_value`.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#storage/{}/{}", self.backend, self.key)
    }
}

/// Last-known value of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// `None` when the backend reported the key absent.
    pub value: Option<String>,
    /// Generation of the key when the value was fetched. Strictly greater
    /// than the version of any entry cached before the latest write.
    pub version: u64,
    /// When the value was fetched.
    pub fetched_at: DateTime<Utc>,
}

/// Serializable view of one entry for inspection tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySnapshot {
    /// `#storage/<backend>/<key>`.
    pub id: String,
    /// Backend.
    pub backend: BackendId,
    /// Logical key.
    pub key: String,
    /// Cached value, `None` if absent or redacted.
    pub value: Option<String>,
    /// Whether `value` was withheld.
    pub redacted: bool,
    /// Entry version.
    pub version: u64,
    /// Fetch time.
    pub fetched_at: DateTime<Utc>,
}

impl EntrySnapshot {
    pub(crate) fn new(key: &CacheKey, entry: &CacheEntry, redact: bool) -> Self {
        Self {
            id: key.to_string(),
            backend: key.backend,
            key: key.key.clone(),
            value: if redact { None } else { entry.value.clone() },
            redacted: redact && entry.value.is_some(),
            version: entry.version,
            fetched_at: entry.fetched_at,
        }
    }
}

/// Counters for cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads served from the cache.
    pub hits: u64,
    /// Reads that went to the backend.
    pub misses: u64,
    /// Fetched values dropped because the key was invalidated mid-fetch.
    pub discarded: u64,
    /// Invalidations from writes, removes, resets, and manual calls.
    pub invalidations: u64,
    /// Entries currently cached.
    pub entries: usize,
}
