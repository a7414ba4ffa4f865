//! Storage error types.
//!
//! A missing key is not an error anywhere in Keyloom: reads return
//! `Ok(None)`. Everything below is a genuine failure.

use crate::backend::BackendId;

/// Errors from storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The key is outside the backend's allow-list.
    #[error("policy violation: key '{key}' is not permitted on the {backend} backend")]
    PolicyViolation {
        /// Backend that rejected the key.
        backend: BackendId,
        /// The rejected logical key.
        key: String,
    },

    /// The backend does not offer this operation.
    #[error("unsupported: the {backend} backend does not support {operation}")]
    Unsupported {
        /// Backend that refused the operation.
        backend: BackendId,
        /// Operation name (e.g. `"list_keys"`).
        operation: &'static str,
    },

    /// No adapter is registered for the backend.
    #[error("unknown backend: no adapter registered for '{0}'")]
    UnknownBackend(BackendId),

    /// The underlying store failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The namespace or key is malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A value could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Discriminant of [`StorageError`], for callers that branch on the kind
/// without caring about the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`StorageError::PolicyViolation`].
    PolicyViolation,
    /// See [`StorageError::Unsupported`].
    Unsupported,
    /// See [`StorageError::UnknownBackend`].
    UnknownBackend,
    /// See [`StorageError::StorageUnavailable`].
    StorageUnavailable,
    /// See [`StorageError::InvalidKey`].
    InvalidKey,
    /// See [`StorageError::Serialization`].
    Serialization,
}

impl ErrorKind {
    /// Stable name used in logs and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PolicyViolation => "PolicyViolation",
            Self::Unsupported => "Unsupported",
            Self::UnknownBackend => "UnknownBackend",
            Self::StorageUnavailable => "StorageUnavailable",
            Self::InvalidKey => "InvalidKey",
            Self::Serialization => "Serialization",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StorageError {
    /// The kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PolicyViolation { .. } => ErrorKind::PolicyViolation,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::UnknownBackend(_) => ErrorKind::UnknownBackend,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::InvalidKey(_) => ErrorKind::InvalidKey,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Deterministic rejection by policy. Retrying can never succeed.
    #[must_use]
    pub const fn is_policy(&self) -> bool {
        matches!(
            self,
            Self::PolicyViolation { .. } | Self::Unsupported { .. } | Self::InvalidKey(_)
        )
    }

    /// Failure of the underlying store. Retry policy belongs to the caller.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    /// Build a [`StorageError::StorageUnavailable`] from any displayable error.
    pub fn unavailable(e: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_errors_are_distinguishable_from_io() {
        let policy = StorageError::PolicyViolation {
            backend: BackendId::Secure,
            key: "apiKey".into(),
        };
        let unsupported = StorageError::Unsupported {
            backend: BackendId::Secure,
            operation: "list_keys",
        };
        let io = StorageError::unavailable("disk full");

        assert!(policy.is_policy() && !policy.is_transient());
        assert!(unsupported.is_policy() && !unsupported.is_transient());
        assert!(io.is_transient() && !io.is_policy());
        assert_eq!(io.kind(), ErrorKind::StorageUnavailable);
    }

    #[test]
    fn test_messages_name_backend_and_key() {
        let err = StorageError::PolicyViolation {
            backend: BackendId::Secure,
            key: "apiKey".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("apiKey"));
        assert!(msg.contains("secure"));
        assert_eq!(err.kind().to_string(), "PolicyViolation");
    }

    #[test]
    fn test_unknown_backend_is_neither_policy_nor_transient() {
        let err = StorageError::UnknownBackend(BackendId::Durable);
        assert!(!err.is_policy());
        assert!(!err.is_transient());
        assert_eq!(err.kind(), ErrorKind::UnknownBackend);
    }
}
