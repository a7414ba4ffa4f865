//! Key codec for namespaces sharing one physical store.
//!
//! A physical key has the form `"mmkv\0{namespace}\0{key}"`. Namespaces may
//! not contain `\0`, so the first separator after the prefix always marks
//! the end of the namespace and the encoding is injective even when the
//! logical key itself is arbitrary.

use std::collections::BTreeSet;
use std::fmt;

use keyloom_core::{StorageError, StorageResult};

/// Prefix shared by every physical key the codec produces.
pub const PHYSICAL_PREFIX: &str = "mmkv";

/// Separator between prefix, namespace, and logical key.
pub const SEPARATOR: char = '\0';

/// Validate that a logical key is safe for storage.
///
/// Keys must be non-empty and must not contain the null byte.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] if the key is empty or contains `\0`.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains(SEPARATOR) {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// A validated key partition inside a shared physical store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a namespace name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the namespace is empty or
    /// contains null bytes.
    pub fn new(name: impl Into<String>) -> StorageResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(StorageError::InvalidKey(
                "namespace must not be empty".into(),
            ));
        }
        if name.contains(SEPARATOR) {
            return Err(StorageError::InvalidKey(
                "namespace must not contain null bytes".into(),
            ));
        }
        Ok(Self(name))
    }

    /// The namespace name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps `(namespace, logical key)` pairs to physical keys and back.
///
/// Decoding only recognises namespaces registered with the codec, so keys
/// written into the shared store by anything else are filtered out.
#[derive(Debug, Clone, Default)]
pub struct KeyCodec {
    namespaces: BTreeSet<Namespace>,
}

impl KeyCodec {
    /// Create a codec that recognises the given namespaces.
    pub fn new(namespaces: impl IntoIterator<Item = Namespace>) -> Self {
        Self {
            namespaces: namespaces.into_iter().collect(),
        }
    }

    /// Recognise one more namespace.
    pub fn register(&mut self, namespace: Namespace) {
        self.namespaces.insert(namespace);
    }

    /// Whether `name` is one of the known namespaces.
    #[must_use]
    pub fn knows(&self, name: &str) -> bool {
        self.namespaces.iter().any(|ns| ns.as_str() == name)
    }

    /// Encode a logical key under `namespace`.
    #[must_use]
    pub fn encode(namespace: &Namespace, key: &str) -> String {
        let mut buf = String::with_capacity(
            PHYSICAL_PREFIX
                .len()
                .saturating_add(namespace.as_str().len())
                .saturating_add(key.len())
                .saturating_add(2),
        );
        buf.push_str(PHYSICAL_PREFIX);
        buf.push(SEPARATOR);
        buf.push_str(namespace.as_str());
        buf.push(SEPARATOR);
        buf.push_str(key);
        buf
    }

    /// The physical prefix shared by every key in `namespace`.
    #[must_use]
    pub fn namespace_prefix(namespace: &Namespace) -> String {
        Self::encode(namespace, "")
    }

    /// Decode a physical key.
    ///
    /// Returns `None` for keys this codec did not produce: wrong prefix,
    /// missing separator, empty logical key, or an unknown namespace.
    #[must_use]
    pub fn decode(&self, physical: &str) -> Option<(Namespace, String)> {
        let rest = physical
            .strip_prefix(PHYSICAL_PREFIX)?
            .strip_prefix(SEPARATOR)?;
        let (namespace, key) = rest.split_once(SEPARATOR)?;
        if key.is_empty() || !self.knows(namespace) {
            return None;
        }
        Some((Namespace(namespace.to_owned()), key.to_owned()))
    }
}
