//! Flat string key-value primitives.
//!
//! A [`RawStore`] knows nothing about namespaces or allow-lists; it is the
//! physical store an adapter persists into. Implementations:
//!
//! - **In-memory** (always available): For tests and ephemeral data
//! - **JSON file** (always available): Durable, one JSON object per file
//! - **`SurrealKV`** (behind `kv` feature): Persistent, versioned, ACID-compliant

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use keyloom_core::{StorageError, StorageResult};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Physical string key-value store.
#[async_trait]
pub trait RawStore: Send + Sync {
    /// Get a value by physical key.
    ///
    /// Returns `None` if the key does not exist.
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Set a value, overwriting any existing one.
    async fn set_item(&self, key: &str, value: String) -> StorageResult<()>;

    /// Remove a key.
    ///
    /// Returns `true` if the key existed.
    async fn remove_item(&self, key: &str) -> StorageResult<bool>;

    /// List every key in the store.
    async fn all_keys(&self) -> StorageResult<Vec<String>>;

    /// Delete every key in the store. Returns the number removed.
    async fn clear(&self) -> StorageResult<u64>;
}

// ---------------------------------------------------------------------------
// In-memory implementation (always available)
// ---------------------------------------------------------------------------

/// In-memory store for tests and ephemeral data.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: std::sync::RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RawStore for MemoryStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.read().map_err(StorageError::unavailable)?;
        Ok(data.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        let mut data = self.data.write().map_err(StorageError::unavailable)?;
        data.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.write().map_err(StorageError::unavailable)?;
        Ok(data.remove(key).is_some())
    }

    async fn all_keys(&self) -> StorageResult<Vec<String>> {
        let data = self.data.read().map_err(StorageError::unavailable)?;
        Ok(data.keys().cloned().collect())
    }

    async fn clear(&self) -> StorageResult<u64> {
        let mut data = self.data.write().map_err(StorageError::unavailable)?;
        let count = data.len() as u64;
        data.clear();
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// JSON file implementation (always available)
// ---------------------------------------------------------------------------

/// Durable store persisting a single JSON object to disk.
///
/// The whole map is loaded at open and every mutation is written through
/// before it returns: the new contents go to a sibling temp file which is
/// then renamed over the original. The in-memory map is replaced only after
/// the rename succeeds, so a failed or abandoned write leaves it unchanged.
pub struct JsonFileStore {
    path: PathBuf,
    data: tokio::sync::Mutex<BTreeMap<String, String>>,
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl JsonFileStore {
    /// Open (or create) a store backed by the file at `path`.
    ///
    /// Parent directories are created if missing. A missing file is an
    /// empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::StorageUnavailable`] if the file cannot be read
    /// and [`StorageError::Serialization`] if it is not a JSON string map.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::unavailable)?;
        }

        let data = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Serialization(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "store file not found, starting empty");
                BTreeMap::new()
            },
            Err(e) => return Err(StorageError::unavailable(e)),
        };

        Ok(Self {
            path,
            data: tokio::sync::Mutex::new(data),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: &BTreeMap<String, String>) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec_pretty(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(StorageError::unavailable)?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            warn!(path = %self.path.display(), error = %e, "failed to replace store file");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::unavailable(e));
        }
        Ok(())
    }
}

#[async_trait]
impl RawStore for JsonFileStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.lock().await;
        Ok(data.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.insert(key.to_owned(), value);
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().await;
        if !data.contains_key(key) {
            return Ok(false);
        }
        let mut next = data.clone();
        next.remove(key);
        self.persist(&next).await?;
        *data = next;
        Ok(true)
    }

    async fn all_keys(&self) -> StorageResult<Vec<String>> {
        let data = self.data.lock().await;
        Ok(data.keys().cloned().collect())
    }

    async fn clear(&self) -> StorageResult<u64> {
        let mut data = self.data.lock().await;
        if data.is_empty() {
            return Ok(0);
        }
        self.persist(&BTreeMap::new()).await?;
        Ok(std::mem::take(&mut *data).len() as u64)
    }
}

// ---------------------------------------------------------------------------
// SurrealKV implementation (behind `kv` feature)
// ---------------------------------------------------------------------------

/// Persistent store backed by `SurrealKV`.
///
/// ACID-compliant, versioned, embedded LSM-tree storage.
/// All operations use transactions internally.
///
/// # Example
///
/// ```rust,ignore
/// use keyloom_storage::SurrealKvStore;
///
/// let store = SurrealKvStore::open("./data/durable")?;
/// store.set_item("demo_async_value", "Hello".into()).await?;
/// ```
#[cfg(feature = "kv")]
pub struct SurrealKvStore {
    tree: surrealkv::Tree,
}

#[cfg(feature = "kv")]
impl std::fmt::Debug for SurrealKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvStore").finish_non_exhaustive()
    }
}

#[cfg(feature = "kv")]
impl SurrealKvStore {
    /// Open a persistent store at the given directory path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::StorageUnavailable`] if the store cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let tree = surrealkv::TreeBuilder::new()
            .with_path(path.as_ref().to_path_buf())
            .build()
            .map_err(|ref e| map_kv_err(e))?;
        Ok(Self { tree })
    }

    /// Close the store, flushing any pending writes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::StorageUnavailable`] if the flush fails.
    pub async fn close(&self) -> StorageResult<()> {
        self.tree.close().await.map_err(|ref e| map_kv_err(e))
    }

    /// Collect every key in the tree. Keys are UTF-8, which never contains
    /// the byte `0xFF`, so `[b"", b"\xff")` spans the whole keyspace.
    fn scan_keys(&self) -> StorageResult<Vec<Vec<u8>>> {
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        let start: Vec<u8> = Vec::new();
        let end: Vec<u8> = vec![0xFF];
        let mut iter = tx.range(&start, &end).map_err(|ref e| map_kv_err(e))?;
        iter.seek_first().map_err(|ref e| map_kv_err(e))?;

        let mut keys = Vec::new();
        while iter.valid() {
            keys.push(iter.key().to_vec());
            iter.next().map_err(|ref e| map_kv_err(e))?;
        }
        Ok(keys)
    }
}

#[cfg(feature = "kv")]
fn map_kv_err(e: &surrealkv::Error) -> StorageError {
    StorageError::StorageUnavailable(e.to_string())
}

#[cfg(feature = "kv")]
#[async_trait]
impl RawStore for SurrealKvStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        let k = key.as_bytes().to_vec();
        tx.get(&k)
            .map_err(|ref e| map_kv_err(e))?
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .transpose()
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        let k = key.as_bytes().to_vec();
        let v = value.into_bytes();
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        tx.set(&k, &v)
            .map_err(|ref e| map_kv_err(e))?;
        tx.commit().await.map_err(|ref e| map_kv_err(e))
    }

    async fn remove_item(&self, key: &str) -> StorageResult<bool> {
        let k = key.as_bytes().to_vec();
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        let existed = tx
            .get(&k)
            .map_err(|ref e| map_kv_err(e))?
            .is_some();
        if existed {
            tx.delete(&k).map_err(|ref e| map_kv_err(e))?;
            tx.commit().await.map_err(|ref e| map_kv_err(e))?;
        }
        Ok(existed)
    }

    async fn all_keys(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .scan_keys()?
            .into_iter()
            .filter_map(|raw| String::from_utf8(raw).ok())
            .collect())
    }

    async fn clear(&self) -> StorageResult<u64> {
        let keys = self.scan_keys()?;
        let count = keys.len() as u64;
        if count == 0 {
            return Ok(0);
        }
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        for key in &keys {
            tx.delete(key).map_err(|ref e| map_kv_err(e))?;
        }
        tx.commit().await.map_err(|ref e| map_kv_err(e))?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- MemoryStore tests --

    #[tokio::test]
    async fn test_memory_get_set() {
        let store = MemoryStore::new();
        store.set_item("key1", "hello".into()).await.unwrap();
        assert_eq!(store.get_item("key1").await.unwrap().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_memory_get_missing() {
        let store = MemoryStore::new();
        assert!(store.get_item("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_remove_is_idempotent() {
        let store = MemoryStore::new();
        store.set_item("k", "v".into()).await.unwrap();
        assert!(store.remove_item("k").await.unwrap());
        assert!(!store.remove_item("k").await.unwrap());
        assert!(store.get_item("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_all_keys_and_clear() {
        let store = MemoryStore::new();
        store.set_item("a", "1".into()).await.unwrap();
        store.set_item("b", "2".into()).await.unwrap();
        let mut keys = store.all_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.all_keys().await.unwrap().is_empty());
    }

    // -- JsonFileStore tests --

    #[tokio::test]
    async fn test_json_file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("durable.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .set_item("demo_async_value", "Hello".into())
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_item("demo_async_value").await.unwrap().as_deref(),
            Some("Hello")
        );
    }

    #[tokio::test]
    async fn test_json_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("store.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.set_item("k", "v".into()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_json_file_remove_and_clear_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.set_item("a", "1".into()).await.unwrap();
        store.set_item("b", "2".into()).await.unwrap();
        assert!(store.remove_item("a").await.unwrap());
        assert!(!store.remove_item("a").await.unwrap());
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.all_keys().await.unwrap(), vec!["b"]);
        assert_eq!(reopened.clear().await.unwrap(), 1);
        drop(reopened);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert!(reopened.all_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_file_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_json_file_failed_persist_leaves_map_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.set_item("a", "1".into()).await.unwrap();

        // A directory where the temp file goes makes every persist fail.
        let tmp = path.with_extension("json.tmp");
        std::fs::create_dir(&tmp).unwrap();

        assert!(store.set_item("a", "2".into()).await.unwrap_err().is_transient());
        assert!(store.set_item("b", "new".into()).await.is_err());
        assert!(store.remove_item("a").await.is_err());
        assert!(store.clear().await.is_err());
        assert_eq!(store.get_item("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.all_keys().await.unwrap(), vec!["a"]);

        std::fs::remove_dir(&tmp).unwrap();
        store.set_item("b", "new".into()).await.unwrap();
        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.all_keys().await.unwrap(), vec!["a", "b"]);
    }

    // -- SurrealKvStore tests (behind feature gate) --

    #[cfg(feature = "kv")]
    mod surreal_kv_tests {
        use super::*;

        fn make_store() -> (SurrealKvStore, tempfile::TempDir) {
            let dir = tempfile::tempdir().unwrap();
            let store = SurrealKvStore::open(dir.path()).unwrap();
            (store, dir)
        }

        #[tokio::test]
        async fn test_surreal_get_set() {
            let (store, _dir) = make_store();
            store.set_item("key1", "hello".into()).await.unwrap();
            assert_eq!(
                store.get_item("key1").await.unwrap().as_deref(),
                Some("hello")
            );
        }

        #[tokio::test]
        async fn test_surreal_remove() {
            let (store, _dir) = make_store();
            store.set_item("k", "v".into()).await.unwrap();
            assert!(store.remove_item("k").await.unwrap());
            assert!(!store.remove_item("k").await.unwrap());
        }

        #[tokio::test]
        async fn test_surreal_all_keys_and_clear() {
            let (store, _dir) = make_store();
            store.set_item("a", "1".into()).await.unwrap();
            store.set_item("b", "2".into()).await.unwrap();
            let mut keys = store.all_keys().await.unwrap();
            keys.sort();
            assert_eq!(keys, vec!["a", "b"]);
            assert_eq!(store.clear().await.unwrap(), 2);
            assert!(store.all_keys().await.unwrap().is_empty());
        }
    }
}
