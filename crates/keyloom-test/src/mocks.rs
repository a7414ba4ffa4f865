//! Mock implementations for testing.

use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keyloom_core::{BackendId, StorageError, StorageResult};
use keyloom_events::{ChangeEvent, ChangeKind, ChangeListener};
use keyloom_storage::{MemoryStore, RawStore};
use tokio::sync::Notify;

/// A [`RawStore`] whose reads and writes can be made to fail on demand.
///
/// Failures surface as [`StorageError::StorageUnavailable`], the same way
/// a real store reports I/O trouble.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    remove_budget: Mutex<Option<usize>>,
    calls: AtomicUsize,
}

impl FailingStore {
    /// Create a store that succeeds until told otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make reads (`get_item`, `all_keys`) fail or succeed.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make writes (`set_item`, `remove_item`, `clear`) fail or succeed.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every call fail or succeed.
    pub fn set_fail_all(&self, fail: bool) {
        self.set_fail_reads(fail);
        self.set_fail_writes(fail);
    }

    /// Let the next `n` removes succeed, then fail every remove after them.
    ///
    /// Models a clear that dies partway through.
    pub fn fail_removes_after(&self, n: usize) {
        if let Ok(mut budget) = self.remove_budget.lock() {
            *budget = Some(n);
        }
    }

    /// Number of calls that reached this store, failed or not.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if flag.load(Ordering::SeqCst) {
            Err(StorageError::unavailable(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }

    fn check_remove(&self) -> StorageResult<()> {
        self.check(&self.fail_writes, "remove")?;
        let mut budget = self.remove_budget.lock().map_err(StorageError::unavailable)?;
        match budget.as_mut() {
            Some(0) => Err(StorageError::unavailable("injected remove failure")),
            Some(left) => {
                *left = left.saturating_sub(1);
                Ok(())
            },
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RawStore for FailingStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        self.check(&self.fail_writes, "write")?;
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> StorageResult<bool> {
        self.check_remove()?;
        self.inner.remove_item(key).await
    }

    async fn all_keys(&self) -> StorageResult<Vec<String>> {
        self.check(&self.fail_reads, "list")?;
        self.inner.all_keys().await
    }

    async fn clear(&self) -> StorageResult<u64> {
        self.check(&self.fail_writes, "clear")?;
        self.inner.clear().await
    }
}

/// A [`RawStore`] whose reads and writes can be held open so races are
/// deterministic.
///
/// While the read gate is closed, `get_item` reads the current value and
/// then parks until [`open`](Self::open) is called, returning the value it
/// read before parking. This models a slow store answering with data that
/// was current when the request arrived.
///
/// Writes to one chosen key can be held the same way with
/// [`hold_writes_to`](Self::hold_writes_to); a held `set_item` parks before
/// it stores anything. Writes to other keys go straight through.
#[derive(Debug, Default)]
pub struct GatedStore {
    inner: MemoryStore,
    closed: AtomicBool,
    parked: Notify,
    release: Notify,
    held_key: Mutex<Option<String>>,
    write_parked: Notify,
    write_release: Notify,
}

impl GatedStore {
    /// Create a store with both gates open.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold subsequent reads until [`open`](Self::open).
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Let future reads through and release every parked read.
    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    /// Wait until a read has parked at the gate.
    pub async fn wait_for_parked_read(&self) {
        self.parked.notified().await;
    }

    /// Hold subsequent `set_item` calls for `key` until
    /// [`release_writes`](Self::release_writes).
    pub fn hold_writes_to(&self, key: &str) {
        if let Ok(mut held) = self.held_key.lock() {
            *held = Some(key.to_owned());
        }
    }

    /// Let future writes through and release every parked write.
    pub fn release_writes(&self) {
        if let Ok(mut held) = self.held_key.lock() {
            *held = None;
        }
        self.write_release.notify_waiters();
    }

    /// Wait until a write has parked at the gate.
    pub async fn wait_for_parked_write(&self) {
        self.write_parked.notified().await;
    }

    fn is_held(&self, key: &str) -> bool {
        self.held_key
            .lock()
            .map(|held| held.as_deref() == Some(key))
            .unwrap_or_default()
    }
}

#[async_trait]
impl RawStore for GatedStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self.inner.get_item(key).await?;
        if self.closed.load(Ordering::SeqCst) {
            let mut released = pin!(self.release.notified());
            released.as_mut().enable();
            self.parked.notify_one();
            released.await;
        }
        Ok(value)
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        if self.is_held(key) {
            let mut released = pin!(self.write_release.notified());
            released.as_mut().enable();
            self.write_parked.notify_one();
            released.await;
        }
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> StorageResult<bool> {
        self.inner.remove_item(key).await
    }

    async fn all_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.all_keys().await
    }

    async fn clear(&self) -> StorageResult<u64> {
        self.inner.clear().await
    }
}

/// A [`ChangeListener`] that records every event it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl RecordingListener {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event seen so far, in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// `(backend, key, kind)` of every event, for compact assertions.
    #[must_use]
    pub fn summary(&self) -> Vec<(BackendId, String, ChangeKind)> {
        self.events()
            .into_iter()
            .map(|e| (e.backend, e.key, e.kind))
            .collect()
    }

    /// Number of events seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or_default()
    }

    /// Whether no events have been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChangeListener for RecordingListener {
    fn on_change(&self, event: &ChangeEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "recording"
    }
}
