//! Change event types.

use chrono::{DateTime, Utc};
use keyloom_core::BackendId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and timing shared by every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
}

impl EventMetadata {
    /// Create metadata stamped with a fresh ID and the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A value was written.
    Set,
    /// The key was removed.
    Deleted,
}

impl ChangeKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Deleted => "deleted",
        }
    }
}

/// A completed write or delete on one `(backend, key)`.
///
/// Events are ephemeral: never persisted, delivered at least once to every
/// subscriber present at publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Event identity.
    pub metadata: EventMetadata,
    /// Backend the key lives in.
    pub backend: BackendId,
    /// Logical key.
    pub key: String,
    /// Set or deleted.
    pub kind: ChangeKind,
    /// The new payload for `Set`. `None` for `Deleted`, and for `Set` on a
    /// backend whose values are redacted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl ChangeEvent {
    /// A value was written.
    pub fn set(backend: BackendId, key: impl Into<String>, new_value: Option<String>) -> Self {
        Self {
            metadata: EventMetadata::new(),
            backend,
            key: key.into(),
            kind: ChangeKind::Set,
            new_value,
        }
    }

    /// A key was removed.
    pub fn deleted(backend: BackendId, key: impl Into<String>) -> Self {
        Self {
            metadata: EventMetadata::new(),
            backend,
            key: key.into(),
            kind: ChangeKind::Deleted,
            new_value: None,
        }
    }

    /// Short label for logs, e.g. `fast/demo_mmkv_value set`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{} {}", self.backend, self.key, self.kind.as_str())
    }
}
