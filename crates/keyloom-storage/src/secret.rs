//! Secret primitives for the restricted secure store.
//!
//! A [`SecretStore`] offers no enumeration: platform keychains address
//! entries one name at a time, so neither does this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use keyloom_core::{StorageError, StorageResult};

/// Per-key secret storage.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a secret. Returns `None` if it does not exist.
    async fn get_secret(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a secret, overwriting any existing one.
    async fn set_secret(&self, key: &str, value: String) -> StorageResult<()>;

    /// Delete a secret. Returns `true` if it existed.
    async fn delete_secret(&self, key: &str) -> StorageResult<bool>;
}

/// In-process secret store for tests and platforms without a keychain.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: std::sync::RwLock<HashMap<String, String>>,
}

impl std::fmt::Debug for MemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.secrets.read().map(|s| s.len()).unwrap_or_default();
        f.debug_struct("MemorySecretStore")
            .field("secret_count", &count)
            .finish()
    }
}

impl MemorySecretStore {
    /// Create an empty secret store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.read().map(|s| s.len()).unwrap_or_default()
    }

    /// Whether the store holds no secrets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self, key: &str) -> StorageResult<Option<String>> {
        let secrets = self.secrets.read().map_err(StorageError::unavailable)?;
        Ok(secrets.get(key).cloned())
    }

    async fn set_secret(&self, key: &str, value: String) -> StorageResult<()> {
        let mut secrets = self.secrets.write().map_err(StorageError::unavailable)?;
        secrets.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete_secret(&self, key: &str) -> StorageResult<bool> {
        let mut secrets = self.secrets.write().map_err(StorageError::unavailable)?;
        Ok(secrets.remove(key).is_some())
    }
}

// ---------------------------------------------------------------------------
// OS keychain implementation (behind `keychain` feature)
// ---------------------------------------------------------------------------

/// Secret store backed by the operating system keychain.
///
/// Each logical key becomes one keychain entry under `service`. The
/// `keyring` API is blocking, so every call runs on the blocking pool.
#[cfg(feature = "keychain")]
#[derive(Debug, Clone)]
pub struct KeychainSecretStore {
    service: String,
}

#[cfg(feature = "keychain")]
impl KeychainSecretStore {
    /// Create a store whose entries live under `service`.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn with_entry<T, F>(&self, key: &str, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&keyring::Entry) -> StorageResult<T> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_owned();
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &key).map_err(StorageError::unavailable)?;
            f(&entry)
        })
        .await
        .map_err(StorageError::unavailable)?
    }
}

#[cfg(feature = "keychain")]
#[async_trait]
impl SecretStore for KeychainSecretStore {
    async fn get_secret(&self, key: &str) -> StorageResult<Option<String>> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::unavailable(e)),
        })
        .await
    }

    async fn set_secret(&self, key: &str, value: String) -> StorageResult<()> {
        self.with_entry(key, move |entry| {
            entry
                .set_password(&value)
                .map_err(StorageError::unavailable)
        })
        .await
    }

    async fn delete_secret(&self, key: &str) -> StorageResult<bool> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(StorageError::unavailable(e)),
        })
        .await
    }
}
