use std::sync::Arc;

use async_trait::async_trait;
use keyloom_core::{BackendId, StorageResult, StoredValue};
use tracing::debug;

use super::StorageAdapter;
use crate::codec::validate_key;
use crate::raw::RawStore;

/// Durable generic store over a dedicated [`RawStore`].
///
/// Logical keys are physical keys. The adapter assumes it owns the whole
/// store: `list_keys` reports every key and `clear` empties it.
#[derive(Clone)]
pub struct DurableStore {
    store: Arc<dyn RawStore>,
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish_non_exhaustive()
    }
}

impl DurableStore {
    /// Wrap a dedicated store.
    pub fn new(store: Arc<dyn RawStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StorageAdapter for DurableStore {
    fn backend(&self) -> BackendId {
        BackendId::Durable
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        self.store.get_item(key).await
    }

    async fn set(&self, key: &str, value: StoredValue) -> StorageResult<()> {
        validate_key(key)?;
        let payload = value.into_payload()?;
        self.store.set_item(key, payload).await?;
        debug!(key, "durable set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let existed = self.store.remove_item(key).await?;
        debug!(key, existed, "durable delete");
        Ok(())
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = self.store.all_keys().await?;
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self) -> StorageResult<Vec<String>> {
        let keys = self.list_keys().await?;
        let count = self.store.clear().await?;
        debug!(count, "durable clear");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::MemoryStore;

    #[tokio::test]
    async fn test_durable_round_trip_number() {
        let durable = DurableStore::new(Arc::new(MemoryStore::new()));
        durable.set("count", StoredValue::from(42.5)).await.unwrap();
        assert_eq!(durable.get("count").await.unwrap().as_deref(), Some("42.5"));
    }

    #[tokio::test]
    async fn test_durable_delete_absent_succeeds() {
        let durable = DurableStore::new(Arc::new(MemoryStore::new()));
        durable.delete("never-written").await.unwrap();
        assert!(durable.get("never-written").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_durable_list_and_clear_whole_store() {
        let durable = DurableStore::new(Arc::new(MemoryStore::new()));
        durable.set("b", "2".into()).await.unwrap();
        durable.set("a", "1".into()).await.unwrap();
        assert_eq!(durable.list_keys().await.unwrap(), vec!["a", "b"]);
        assert_eq!(durable.clear().await.unwrap(), vec!["a", "b"]);
        assert!(durable.list_keys().await.unwrap().is_empty());
    }
}
