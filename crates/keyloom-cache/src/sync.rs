//! Cache synchronizer: read-through caching with write invalidation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use keyloom_core::{BackendId, StorageResult, StoredValue};
use keyloom_events::{ChangeEvent, ChangeNotifier};
use keyloom_storage::StorageFacade;
use tracing::{debug, trace, warn};

use crate::entry::{CacheKey, CacheStats, EntrySnapshot};
use crate::table::CacheTable;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    discarded: AtomicU64,
    invalidations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Reactive layer over a [`StorageFacade`].
///
/// Reads are served from the cache when possible. Every successful write,
/// remove, or reset through the synchronizer evicts the affected entries
/// and then publishes a [`ChangeEvent`], in that order. Failed writes and
/// removes touch neither the cache nor the notifier; a failed reset still
/// evicts the backend's entries.
///
/// Clones share the cache, the notifier, and the counters.
#[derive(Debug, Clone)]
pub struct CacheSynchronizer {
    facade: Arc<StorageFacade>,
    table: Arc<CacheTable>,
    notifier: ChangeNotifier,
    counters: Arc<Counters>,
    redacted: BTreeSet<BackendId>,
}

impl CacheSynchronizer {
    /// Wrap `facade`, publishing changes on `notifier`.
    pub fn new(facade: StorageFacade, notifier: ChangeNotifier) -> Self {
        Self {
            facade: Arc::new(facade),
            table: Arc::new(CacheTable::new()),
            notifier,
            counters: Arc::new(Counters::default()),
            redacted: BTreeSet::new(),
        }
    }

    /// Withhold values of `backend` from change events and snapshots.
    #[must_use]
    pub fn with_redacted_backend(mut self, backend: BackendId) -> Self {
        self.redacted.insert(backend);
        self
    }

    /// The facade underneath.
    #[must_use]
    pub fn facade(&self) -> &StorageFacade {
        &self.facade
    }

    /// The notifier changes are published on.
    #[must_use]
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// The cache table.
    #[must_use]
    pub fn table(&self) -> &CacheTable {
        &self.table
    }

    fn is_redacted(&self, backend: BackendId) -> bool {
        self.redacted.contains(&backend)
    }

    /// Read a key, from the cache if present, otherwise from the backend.
    ///
    /// A successful backend read (absent included) is cached unless the key
    /// was invalidated while the read was in flight. Errors are never
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns any error from the facade.
    pub async fn cached_read(&self, backend: BackendId, key: &str) -> StorageResult<Option<String>> {
        let cache_key = CacheKey::new(backend, key);
        if let Some(entry) = self.table.lookup(&cache_key) {
            Counters::bump(&self.counters.hits);
            trace!(%backend, key, version = entry.version, "cache hit");
            return Ok(entry.value);
        }

        Counters::bump(&self.counters.misses);
        let ticket = self.table.ticket(cache_key);
        let value = self.facade.read(backend, key).await?;
        if ticket.commit(value.clone()) {
            trace!(%backend, key, "cache fill");
        } else {
            Counters::bump(&self.counters.discarded);
            debug!(%backend, key, "fetched value superseded by a write, not cached");
        }
        Ok(value)
    }

    /// Write through to the backend, then invalidate and announce.
    ///
    /// # Errors
    ///
    /// Returns any error from the facade, including coercion errors. Key
    /// and policy checks run before the value is coerced. On error the
    /// cache is left as it was and no event is published.
    pub async fn write(
        &self,
        backend: BackendId,
        key: &str,
        value: impl Into<StoredValue> + Send,
    ) -> StorageResult<()> {
        let value = value.into();
        self.facade.write(backend, key, value.clone()).await?;
        self.invalidate(backend, key);

        // The adapter already coerced this value, so this cannot fail here.
        let new_value = if self.is_redacted(backend) {
            None
        } else {
            value.into_payload().ok()
        };
        self.notifier
            .publish(ChangeEvent::set(backend, key, new_value));
        Ok(())
    }

    /// Remove through to the backend, then invalidate and announce.
    ///
    /// # Errors
    ///
    /// Returns any error from the facade. On error the cache is left as it
    /// was and no event is published.
    pub async fn remove(&self, backend: BackendId, key: &str) -> StorageResult<()> {
        self.facade.remove(backend, key).await?;
        self.invalidate(backend, key);
        self.notifier.publish(ChangeEvent::deleted(backend, key));
        Ok(())
    }

    /// Clear the backend, invalidate all of its cached keys, and announce
    /// one deletion per removed key. Returns the removed keys.
    ///
    /// # Errors
    ///
    /// Returns any error from the facade. A clear can fail after removing
    /// some keys, so the backend's cached keys are invalidated on error too;
    /// no event is published in that case.
    pub async fn reset(&self, backend: BackendId) -> StorageResult<Vec<String>> {
        let result = self.facade.reset(backend).await;
        let invalidated = self.table.invalidate_backend(backend);
        self.counters
            .invalidations
            .fetch_add(invalidated as u64, Ordering::Relaxed);
        let removed = match result {
            Ok(removed) => removed,
            Err(e) => {
                warn!(%backend, invalidated, error = %e, "backend reset failed, cache invalidated");
                return Err(e);
            },
        };
        debug!(%backend, removed = removed.len(), invalidated, "backend reset");
        for key in &removed {
            self.notifier.publish(ChangeEvent::deleted(backend, key.as_str()));
        }
        Ok(removed)
    }

    /// List the backend's keys. Never cached.
    ///
    /// # Errors
    ///
    /// Returns any error from the facade, including `Unsupported`.
    pub async fn enumerate(&self, backend: BackendId) -> StorageResult<Vec<String>> {
        self.facade.enumerate(backend).await
    }

    /// Drop the cached entry for `(backend, key)` without touching the
    /// backend or publishing anything.
    pub fn invalidate(&self, backend: BackendId, key: &str) {
        let version = self.table.invalidate(&CacheKey::new(backend, key));
        Counters::bump(&self.counters.invalidations);
        trace!(%backend, key, version, "cache invalidated");
    }

    /// Inspection view of every cached entry.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        self.table
            .snapshot()
            .iter()
            .map(|(key, entry)| EntrySnapshot::new(key, entry, self.is_redacted(key.backend)))
            .collect()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            entries: self.table.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyloom_core::StorageError;
    use keyloom_events::ChangeKind;
    use keyloom_storage::{MemoryStore, RawStore};
    use keyloom_test::{FailingStore, RecordingListener, memory_facade, memory_facade_with};

    fn synchronizer() -> (CacheSynchronizer, RecordingListener) {
        let sync = CacheSynchronizer::new(memory_facade(), ChangeNotifier::new());
        let recorder = RecordingListener::new();
        sync.notifier().subscribe(Arc::new(recorder.clone())).detach();
        (sync, recorder)
    }

    #[tokio::test]
    async fn test_second_read_is_a_hit() {
        let (sync, _) = synchronizer();
        sync.facade()
            .write(BackendId::Fast, "demo_mmkv_value", "Hello")
            .await
            .unwrap();

        for _ in 0..2 {
            assert_eq!(
                sync.cached_read(BackendId::Fast, "demo_mmkv_value")
                    .await
                    .unwrap()
                    .as_deref(),
                Some("Hello")
            );
        }
        let stats = sync.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_read_after_write_sees_new_value() {
        let (sync, _) = synchronizer();
        sync.write(BackendId::Durable, "k", "old").await.unwrap();
        assert_eq!(
            sync.cached_read(BackendId::Durable, "k").await.unwrap().as_deref(),
            Some("old")
        );

        sync.write(BackendId::Durable, "k", "new").await.unwrap();
        assert_eq!(
            sync.cached_read(BackendId::Durable, "k").await.unwrap().as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn test_absent_result_is_cached_then_invalidated_by_write() {
        let (sync, _) = synchronizer();
        assert!(sync.cached_read(BackendId::Fast, "k").await.unwrap().is_none());
        assert!(sync.cached_read(BackendId::Fast, "k").await.unwrap().is_none());
        assert_eq!(sync.stats().hits, 1);

        sync.write(BackendId::Fast, "k", 7.5).await.unwrap();
        assert_eq!(
            sync.cached_read(BackendId::Fast, "k").await.unwrap().as_deref(),
            Some("7.5")
        );
    }

    #[tokio::test]
    async fn test_remove_evicts_and_announces() {
        let (sync, recorder) = synchronizer();
        sync.write(BackendId::Secure, "userToken", "tok-1").await.unwrap();
        sync.cached_read(BackendId::Secure, "userToken").await.unwrap();

        sync.remove(BackendId::Secure, "userToken").await.unwrap();
        assert!(sync.table().is_empty());
        assert!(sync.cached_read(BackendId::Secure, "userToken").await.unwrap().is_none());
        assert_eq!(
            recorder.summary(),
            vec![
                (BackendId::Secure, "userToken".to_string(), ChangeKind::Set),
                (BackendId::Secure, "userToken".to_string(), ChangeKind::Deleted),
            ]
        );
    }

    #[tokio::test]
    async fn test_event_published_after_invalidation() {
        let (sync, _) = synchronizer();
        sync.write(BackendId::Durable, "k", "v1").await.unwrap();
        sync.cached_read(BackendId::Durable, "k").await.unwrap();

        let table = Arc::clone(&sync.table);
        let observed = Arc::new(std::sync::Mutex::new(None));
        let o = Arc::clone(&observed);
        let _sub = sync.notifier().subscribe_fn("cache-check", move |event| {
            let cached = table.lookup(&CacheKey::new(event.backend, event.key.clone()));
            *o.lock().unwrap() = Some(cached.is_none());
        });

        sync.write(BackendId::Durable, "k", "v2").await.unwrap();
        assert_eq!(*observed.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_policy_violation_is_not_cached_or_announced() {
        let (sync, recorder) = synchronizer();
        let err = sync.write(BackendId::Secure, "apiKey", "sk").await.unwrap_err();
        assert!(matches!(err, StorageError::PolicyViolation { .. }));
        assert!(sync.cached_read(BackendId::Secure, "apiKey").await.is_err());
        assert!(sync.table().is_empty());
        assert!(recorder.is_empty());
    }

    #[tokio::test]
    async fn test_failed_read_is_not_cached() {
        let durable = Arc::new(FailingStore::new());
        let facade = memory_facade_with(Arc::new(MemoryStore::new()), Arc::clone(&durable) as Arc<dyn RawStore>);
        let sync = CacheSynchronizer::new(facade, ChangeNotifier::new());
        sync.write(BackendId::Durable, "k", "v").await.unwrap();

        durable.set_fail_reads(true);
        let err = sync.cached_read(BackendId::Durable, "k").await.unwrap_err();
        assert!(err.is_transient());
        assert!(sync.table().is_empty());

        durable.set_fail_reads(false);
        assert_eq!(
            sync.cached_read(BackendId::Durable, "k").await.unwrap().as_deref(),
            Some("v")
        );
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cached_entry() {
        let durable = Arc::new(FailingStore::new());
        let facade = memory_facade_with(Arc::new(MemoryStore::new()), Arc::clone(&durable) as Arc<dyn RawStore>);
        let sync = CacheSynchronizer::new(facade, ChangeNotifier::new());
        let recorder = RecordingListener::new();
        let _sub = sync.notifier().subscribe(Arc::new(recorder.clone()));

        sync.write(BackendId::Durable, "k", "v").await.unwrap();
        sync.cached_read(BackendId::Durable, "k").await.unwrap();

        durable.set_fail_writes(true);
        assert!(sync.write(BackendId::Durable, "k", "lost").await.is_err());
        assert!(sync.remove(BackendId::Durable, "k").await.is_err());

        let entry = sync.table().lookup(&CacheKey::new(BackendId::Durable, "k")).unwrap();
        assert_eq!(entry.value.as_deref(), Some("v"));
        assert_eq!(recorder.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_invalidates_backend_and_announces_each_key() {
        let (sync, recorder) = synchronizer();
        sync.write(BackendId::Fast, "a", "1").await.unwrap();
        sync.write(BackendId::Fast, "b", "2").await.unwrap();
        sync.write(BackendId::Durable, "a", "keep").await.unwrap();
        sync.cached_read(BackendId::Fast, "a").await.unwrap();
        sync.cached_read(BackendId::Durable, "a").await.unwrap();

        let removed = sync.reset(BackendId::Fast).await.unwrap();
        assert_eq!(removed, vec!["a", "b"]);
        assert!(sync.cached_read(BackendId::Fast, "a").await.unwrap().is_none());
        assert!(sync.table().lookup(&CacheKey::new(BackendId::Durable, "a")).is_some());

        let deletes: Vec<_> = recorder
            .summary()
            .into_iter()
            .filter(|(_, _, kind)| *kind == ChangeKind::Deleted)
            .map(|(_, key, _)| key)
            .collect();
        assert_eq!(deletes, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_redacted_backend_hides_values() {
        let sync = CacheSynchronizer::new(memory_facade(), ChangeNotifier::new())
            .with_redacted_backend(BackendId::Secure);
        let recorder = RecordingListener::new();
        let _sub = sync.notifier().subscribe(Arc::new(recorder.clone()));

        sync.write(BackendId::Secure, "userToken", "tok-1").await.unwrap();
        sync.write(BackendId::Fast, "k", "visible").await.unwrap();
        sync.cached_read(BackendId::Secure, "userToken").await.unwrap();

        let events = recorder.events();
        assert!(events[0].new_value.is_none());
        assert_eq!(events[1].new_value.as_deref(), Some("visible"));

        let snapshot = sync.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].redacted);
        assert!(snapshot[0].value.is_none());
    }

    #[tokio::test]
    async fn test_enumerate_passes_through() {
        let (sync, _) = synchronizer();
        sync.write(BackendId::Durable, "x", "1").await.unwrap();
        assert_eq!(sync.enumerate(BackendId::Durable).await.unwrap(), vec!["x"]);
        assert!(matches!(
            sync.enumerate(BackendId::Secure).await,
            Err(StorageError::Unsupported { .. })
        ));
        assert!(sync.table().is_empty());
    }

    #[tokio::test]
    async fn test_manual_invalidate_publishes_nothing() {
        let (sync, recorder) = synchronizer();
        sync.cached_read(BackendId::Fast, "k").await.unwrap();
        sync.invalidate(BackendId::Fast, "k");
        assert!(sync.table().is_empty());
        assert!(recorder.is_empty());
        assert_eq!(sync.stats().invalidations, 1);
    }

    #[tokio::test]
    async fn test_partial_reset_failure_invalidates_backend() {
        let fast = Arc::new(FailingStore::new());
        let facade = memory_facade_with(Arc::clone(&fast) as Arc<dyn RawStore>, Arc::new(MemoryStore::new()));
        let sync = CacheSynchronizer::new(facade, ChangeNotifier::new());
        let recorder = RecordingListener::new();
        sync.write(BackendId::Fast, "a", "1").await.unwrap();
        sync.write(BackendId::Fast, "b", "2").await.unwrap();
        sync.write(BackendId::Durable, "a", "keep").await.unwrap();
        for (backend, key) in [(BackendId::Fast, "a"), (BackendId::Fast, "b"), (BackendId::Durable, "a")] {
            sync.cached_read(backend, key).await.unwrap();
        }
        let _sub = sync.notifier().subscribe(Arc::new(recorder.clone()));

        fast.fail_removes_after(1);
        let err = sync.reset(BackendId::Fast).await.unwrap_err();
        assert!(err.is_transient());
        assert!(recorder.is_empty());

        for key in ["a", "b"] {
            assert_eq!(
                sync.cached_read(BackendId::Fast, key).await.unwrap(),
                sync.facade().read(BackendId::Fast, key).await.unwrap(),
                "cache diverged from store for {key}"
            );
        }
        assert!(sync.table().lookup(&CacheKey::new(BackendId::Durable, "a")).is_some());
    }

    #[tokio::test]
    async fn test_rejected_reads_and_stray_invalidations_stay_untracked() {
        let (sync, _) = synchronizer();
        for i in 0..500 {
            assert!(sync.cached_read(BackendId::Secure, &format!("rejected-{i}")).await.is_err());
            assert!(sync.cached_read(BackendId::Fast, "").await.is_err());
            sync.invalidate(BackendId::Durable, &format!("never-read-{i}"));
        }
        assert_eq!(sync.table().tracked(), 0);
        assert_eq!(sync.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_failed_read_releases_tracked_key() {
        let durable = Arc::new(FailingStore::new());
        let facade = memory_facade_with(Arc::new(MemoryStore::new()), Arc::clone(&durable) as Arc<dyn RawStore>);
        let sync = CacheSynchronizer::new(facade, ChangeNotifier::new());
        durable.set_fail_reads(true);
        for i in 0..100 {
            assert!(sync.cached_read(BackendId::Durable, &format!("k{i}")).await.is_err());
        }
        assert_eq!(sync.table().tracked(), 0);
    }

    #[tokio::test]
    async fn test_disallowed_key_fails_policy_before_coercion() {
        let (sync, recorder) = synchronizer();
        let err = sync.write(BackendId::Secure, "apiKey", f64::NAN).await.unwrap_err();
        assert!(matches!(err, StorageError::PolicyViolation { .. }), "got {err:?}");

        let err = sync.write(BackendId::Fast, "", f64::INFINITY).await.unwrap_err();
        assert_eq!(err.kind(), keyloom_core::ErrorKind::InvalidKey);

        let err = sync.write(BackendId::Secure, "userToken", f64::NAN).await.unwrap_err();
        assert_eq!(err.kind(), keyloom_core::ErrorKind::Serialization);
        assert!(recorder.is_empty());
    }
}
