//! Value coercion at the adapter boundary.
//!
//! Every backend persists strings. [`StoredValue`] carries a caller's typed
//! input up to the adapter, where [`StoredValue::into_payload`] turns it into
//! the string that is actually written. The `decode_*` functions are the
//! exact mirror: a payload written from a number, boolean, or JSON document
//! reads back as the same value.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageError, StorageResult};

/// A value on its way into a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// Stored verbatim.
    Text(String),
    /// Stored as its shortest round-tripping decimal form.
    Number(f64),
    /// Stored as `true` / `false`.
    Bool(bool),
    /// Stored as compact JSON.
    Json(serde_json::Value),
}

impl StoredValue {
    /// Serialize any `Serialize` type into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> StorageResult<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Coerce to the string payload persisted by a backend.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] for non-finite numbers, which
    /// have no payload that parses back to the same value.
    pub fn into_payload(self) -> StorageResult<String> {
        match self {
            Self::Text(s) => Ok(s),
            Self::Number(n) if !n.is_finite() => Err(StorageError::Serialization(format!(
                "cannot store non-finite number {n}"
            ))),
            Self::Number(n) => {
                serde_json::to_string(&n).map_err(|e| StorageError::Serialization(e.to_string()))
            },
            Self::Bool(b) => Ok(b.to_string()),
            Self::Json(v) => {
                serde_json::to_string(&v).map_err(|e| StorageError::Serialization(e.to_string()))
            },
        }
    }
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for StoredValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

// Integers go through JSON so values beyond 2^53 keep every digit.
impl From<i64> for StoredValue {
    fn from(n: i64) -> Self {
        Self::Json(serde_json::Value::from(n))
    }
}

impl From<bool> for StoredValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<serde_json::Value> for StoredValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

/// Parse a payload written from a number.
///
/// # Errors
///
/// Returns [`StorageError::Serialization`] if the payload is not a number.
pub fn decode_number(payload: &str) -> StorageResult<f64> {
    payload
        .trim()
        .parse::<f64>()
        .map_err(|e| StorageError::Serialization(format!("'{payload}' is not a number: {e}")))
}

/// Parse a payload written from a boolean.
///
/// # Errors
///
/// Returns [`StorageError::Serialization`] if the payload is not `true` or `false`.
pub fn decode_bool(payload: &str) -> StorageResult<bool> {
    serde_json::from_str(payload)
        .map_err(|e| StorageError::Serialization(format!("'{payload}' is not a boolean: {e}")))
}

/// Parse a payload written from a JSON document.
///
/// # Errors
///
/// Returns [`StorageError::Serialization`] if deserialization fails.
pub fn decode_json<T: DeserializeOwned>(payload: &str) -> StorageResult<T> {
    serde_json::from_str(payload).map_err(|e| StorageError::Serialization(e.to_string()))
}
