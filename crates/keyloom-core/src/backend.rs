//! Backend identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifies one of the storage backends behind the facade.
///
/// The set is closed: adding a backend means adding a variant here, an
/// adapter implementing the storage contract, and registering it with the
/// facade. Nothing else dispatches on this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// Fast namespaced store sharing one physical store between namespaces.
    Fast,
    /// Generic durable store owning a dedicated physical store.
    Durable,
    /// Restricted secure store gated by an allow-list.
    Secure,
}

impl BackendId {
    /// All backends, in display order.
    pub const ALL: [Self; 3] = [Self::Fast, Self::Durable, Self::Secure];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Durable => "durable",
            Self::Secure => "secure",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised backend name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backend '{0}'; expected one of: fast, durable, secure")]
pub struct ParseBackendError(String);

impl FromStr for BackendId {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" | "mmkv" => Ok(Self::Fast),
            "durable" | "async" => Ok(Self::Durable),
            "secure" | "securestore" => Ok(Self::Secure),
            _ => Err(ParseBackendError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_as_str() {
        for backend in BackendId::ALL {
            assert_eq!(backend.to_string(), backend.as_str());
        }
    }

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!("fast".parse::<BackendId>().unwrap(), BackendId::Fast);
        assert_eq!("MMKV".parse::<BackendId>().unwrap(), BackendId::Fast);
        assert_eq!("async".parse::<BackendId>().unwrap(), BackendId::Durable);
        assert_eq!(
            "SecureStore".parse::<BackendId>().unwrap(),
            BackendId::Secure
        );
        assert!("redis".parse::<BackendId>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&BackendId::Durable).unwrap();
        assert_eq!(json, "\"durable\"");
        let back: BackendId = serde_json::from_str("\"secure\"").unwrap();
        assert_eq!(back, BackendId::Secure);
    }
}
