use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use keyloom_core::{BackendId, StorageError, StorageResult, StoredValue};
use tracing::{debug, warn};

use super::StorageAdapter;
use crate::codec::validate_key;
use crate::secret::SecretStore;

/// The fixed set of keys a restricted backend accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList(BTreeSet<String>);

impl AllowList {
    /// Build an allow-list, validating every entry as a logical key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if any entry is empty or contains `\0`.
    pub fn new<I, S>(keys: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for key in keys {
            let key = key.into();
            validate_key(&key)?;
            set.insert(key);
        }
        Ok(Self(set))
    }

    /// Whether `key` is permitted.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Iterate over permitted keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of permitted keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is permitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Restricted secure store.
///
/// Every operation checks the allow-list before the underlying
/// [`SecretStore`] is touched, so a rejected key never reaches it.
/// Enumeration is refused outright.
#[derive(Clone)]
pub struct SecureStore {
    secrets: Arc<dyn SecretStore>,
    allow_list: AllowList,
}

impl std::fmt::Debug for SecureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStore")
            .field("allow_list", &self.allow_list)
            .finish_non_exhaustive()
    }
}

impl SecureStore {
    /// Create an adapter over `secrets` accepting only `allow_list`.
    pub fn new(secrets: Arc<dyn SecretStore>, allow_list: AllowList) -> Self {
        Self {
            secrets,
            allow_list,
        }
    }

    /// The configured allow-list.
    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    fn check(&self, key: &str) -> StorageResult<()> {
        if self.allow_list.contains(key) {
            Ok(())
        } else {
            warn!(key, "rejected key outside secure allow-list");
            Err(StorageError::PolicyViolation {
                backend: BackendId::Secure,
                key: key.to_owned(),
            })
        }
    }
}

#[async_trait]
impl StorageAdapter for SecureStore {
    fn backend(&self) -> BackendId {
        BackendId::Secure
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.check(key)?;
        self.secrets.get_secret(key).await
    }

    async fn set(&self, key: &str, value: StoredValue) -> StorageResult<()> {
        self.check(key)?;
        let payload = value.into_payload()?;
        self.secrets.set_secret(key, payload).await?;
        debug!(key, "secure set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.check(key)?;
        let existed = self.secrets.delete_secret(key).await?;
        debug!(key, existed, "secure delete");
        Ok(())
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        Err(StorageError::Unsupported {
            backend: BackendId::Secure,
            operation: "list_keys",
        })
    }

    async fn clear(&self) -> StorageResult<Vec<String>> {
        let mut removed = Vec::new();
        for key in self.allow_list.iter() {
            if self.secrets.delete_secret(key).await? {
                removed.push(key.to_owned());
            }
        }
        debug!(count = removed.len(), "secure clear");
        Ok(removed)
    }
}
