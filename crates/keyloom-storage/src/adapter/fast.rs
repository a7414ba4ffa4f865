use std::sync::Arc;

use async_trait::async_trait;
use keyloom_core::{BackendId, StorageResult, StoredValue};
use tracing::{debug, trace};

use super::StorageAdapter;
use crate::codec::{KeyCodec, Namespace, validate_key};
use crate::raw::RawStore;

/// Fast namespaced store.
///
/// Many namespaces share one physical [`RawStore`]; the [`KeyCodec`] keeps
/// them apart. Key listing decodes every physical key and keeps only those
/// in this adapter's namespace, so foreign entries in the shared store are
/// never reported or cleared.
///
/// # Example
///
/// ```rust,ignore
/// use keyloom_storage::{FastStore, MemoryStore, Namespace};
/// use std::sync::Arc;
///
/// let shared = Arc::new(MemoryStore::new());
/// let fast = FastStore::new(shared, Namespace::new("rn-dev-tools-example")?);
/// fast.set("demo_mmkv_value", "Hello".into()).await?;
/// ```
#[derive(Clone)]
pub struct FastStore {
    store: Arc<dyn RawStore>,
    codec: KeyCodec,
    namespace: Namespace,
}

impl std::fmt::Debug for FastStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl FastStore {
    /// Create an adapter for `namespace` over the shared `store`.
    pub fn new(store: Arc<dyn RawStore>, namespace: Namespace) -> Self {
        let codec = KeyCodec::new([namespace.clone()]);
        Self {
            store,
            codec,
            namespace,
        }
    }

    /// Create an adapter that shares a codec with sibling namespaces.
    ///
    /// `namespace` is registered with the codec if it is not already known.
    pub fn with_codec(store: Arc<dyn RawStore>, namespace: Namespace, mut codec: KeyCodec) -> Self {
        codec.register(namespace.clone());
        Self {
            store,
            codec,
            namespace,
        }
    }

    /// The namespace this adapter is scoped to.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn physical(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        Ok(KeyCodec::encode(&self.namespace, key))
    }
}

#[async_trait]
impl StorageAdapter for FastStore {
    fn backend(&self) -> BackendId {
        BackendId::Fast
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let physical = self.physical(key)?;
        trace!(namespace = %self.namespace, key, "fast get");
        self.store.get_item(&physical).await
    }

    async fn set(&self, key: &str, value: StoredValue) -> StorageResult<()> {
        let physical = self.physical(key)?;
        let payload = value.into_payload()?;
        self.store.set_item(&physical, payload).await?;
        debug!(namespace = %self.namespace, key, "fast set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let physical = self.physical(key)?;
        let existed = self.store.remove_item(&physical).await?;
        debug!(namespace = %self.namespace, key, existed, "fast delete");
        Ok(())
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .store
            .all_keys()
            .await?
            .iter()
            .filter_map(|physical| self.codec.decode(physical))
            .filter(|(namespace, _)| *namespace == self.namespace)
            .map(|(_, key)| key)
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self) -> StorageResult<Vec<String>> {
        let keys = self.list_keys().await?;
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if self
                .store
                .remove_item(&KeyCodec::encode(&self.namespace, &key))
                .await?
            {
                removed.push(key);
            }
        }
        debug!(namespace = %self.namespace, count = removed.len(), "fast clear");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::MemoryStore;

    fn ns(name: &str) -> Namespace {
        Namespace::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_fast_get_set() {
        let fast = FastStore::new(Arc::new(MemoryStore::new()), ns("app"));
        fast.set("demo_mmkv_value", "Hello".into()).await.unwrap();
        assert_eq!(
            fast.get("demo_mmkv_value").await.unwrap().as_deref(),
            Some("Hello")
        );
    }

    #[tokio::test]
    async fn test_fast_writes_encoded_physical_key() {
        let shared = Arc::new(MemoryStore::new());
        let fast = FastStore::new(Arc::clone(&shared) as Arc<dyn RawStore>, ns("app"));
        fast.set("k", "v".into()).await.unwrap();

        let physical = shared.all_keys().await.unwrap();
        assert_eq!(physical, vec![KeyCodec::encode(&ns("app"), "k")]);
    }

    #[tokio::test]
    async fn test_fast_list_ignores_foreign_entries() {
        let shared: Arc<dyn RawStore> = Arc::new(MemoryStore::new());
        shared
            .set_item("demo_async_value", "raw".into())
            .await
            .unwrap();
        let fast = FastStore::new(Arc::clone(&shared), ns("app"));
        fast.set("a", "1".into()).await.unwrap();

        assert_eq!(fast.list_keys().await.unwrap(), vec!["a"]);
        assert_eq!(fast.clear().await.unwrap(), vec!["a"]);
        assert_eq!(
            shared.get_item("demo_async_value").await.unwrap().as_deref(),
            Some("raw")
        );
    }

    #[tokio::test]
    async fn test_fast_shared_codec_keeps_namespaces_apart() {
        let shared: Arc<dyn RawStore> = Arc::new(MemoryStore::new());
        let codec = KeyCodec::new([ns("a"), ns("b")]);
        let a = FastStore::with_codec(Arc::clone(&shared), ns("a"), codec.clone());
        let b = FastStore::with_codec(Arc::clone(&shared), ns("b"), codec);

        a.set("k", "from-a".into()).await.unwrap();
        b.set("k", "from-b".into()).await.unwrap();

        assert_eq!(a.get("k").await.unwrap().as_deref(), Some("from-a"));
        assert_eq!(b.list_keys().await.unwrap(), vec!["k"]);
        a.clear().await.unwrap();
        assert!(a.get("k").await.unwrap().is_none());
        assert_eq!(b.get("k").await.unwrap().as_deref(), Some("from-b"));
    }

    #[tokio::test]
    async fn test_fast_rejects_invalid_key() {
        let fast = FastStore::new(Arc::new(MemoryStore::new()), ns("app"));
        assert!(fast.get("").await.is_err());
        assert!(fast.set("k\0x", "v".into()).await.is_err());
    }
}
