//! Storage facade: the single routing entry point.
//!
//! The facade selects an adapter by [`BackendId`] and forwards the call. It
//! does no caching and passes every error through unmodified.

use std::collections::HashMap;
use std::sync::Arc;

use keyloom_core::value::{decode_bool, decode_json, decode_number};
use keyloom_core::{BackendId, StorageError, StorageResult, StoredValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::adapter::StorageAdapter;

/// Routes storage calls to the adapter registered for each backend.
///
/// # Example
///
/// ```rust,ignore
/// use keyloom_storage::{BackendId, DurableStore, MemoryStore, StorageFacade};
/// use std::sync::Arc;
///
/// let facade = StorageFacade::builder()
///     .with_adapter(DurableStore::new(Arc::new(MemoryStore::new())))
///     .build();
/// facade.write(BackendId::Durable, "demo_async_value", "Hello").await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct StorageFacade {
    adapters: HashMap<BackendId, Arc<dyn StorageAdapter>>,
}

impl StorageFacade {
    /// Create a facade with no adapters registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a facade.
    #[must_use]
    pub fn builder() -> StorageFacadeBuilder {
        StorageFacadeBuilder::default()
    }

    /// Register an adapter under its own backend, returning any adapter it
    /// replaced.
    pub fn register(&mut self, adapter: Arc<dyn StorageAdapter>) -> Option<Arc<dyn StorageAdapter>> {
        let backend = adapter.backend();
        debug!(%backend, "registering storage adapter");
        self.adapters.insert(backend, adapter)
    }

    /// Backends with a registered adapter, in display order.
    #[must_use]
    pub fn backends(&self) -> Vec<BackendId> {
        BackendId::ALL
            .into_iter()
            .filter(|b| self.adapters.contains_key(b))
            .collect()
    }

    /// The adapter registered for `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownBackend`] if none is registered.
    pub fn adapter(&self, backend: BackendId) -> StorageResult<&Arc<dyn StorageAdapter>> {
        self.adapters
            .get(&backend)
            .ok_or(StorageError::UnknownBackend(backend))
    }

    /// Read a key. A missing key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns any error from routing or from the adapter.
    pub async fn read(&self, backend: BackendId, key: &str) -> StorageResult<Option<String>> {
        self.adapter(backend)?.get(key).await
    }

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns any error from routing, coercion, or the adapter.
    pub async fn write(
        &self,
        backend: BackendId,
        key: &str,
        value: impl Into<StoredValue> + Send,
    ) -> StorageResult<()> {
        let value = value.into();
        self.adapter(backend)?.set(key, value).await
    }

    /// Remove a key. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns any error from routing or from the adapter.
    pub async fn remove(&self, backend: BackendId, key: &str) -> StorageResult<()> {
        self.adapter(backend)?.delete(key).await
    }

    /// List the backend's keys.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unsupported`] for backends that forbid
    /// enumeration, or any routing or adapter error.
    pub async fn enumerate(&self, backend: BackendId) -> StorageResult<Vec<String>> {
        self.adapter(backend)?.list_keys().await
    }

    /// Clear everything the backend's adapter owns, returning the keys removed.
    ///
    /// # Errors
    ///
    /// Returns any error from routing or from the adapter.
    pub async fn reset(&self, backend: BackendId) -> StorageResult<Vec<String>> {
        self.adapter(backend)?.clear().await
    }

    // -- Typed convenience --

    /// Read a value written from a number.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the stored payload is not a number.
    pub async fn read_number(&self, backend: BackendId, key: &str) -> StorageResult<Option<f64>> {
        self.read(backend, key)
            .await?
            .map(|payload| decode_number(&payload))
            .transpose()
    }

    /// Read a value written from a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the stored payload is not a boolean.
    pub async fn read_bool(&self, backend: BackendId, key: &str) -> StorageResult<Option<bool>> {
        self.read(backend, key)
            .await?
            .map(|payload| decode_bool(&payload))
            .transpose()
    }

    /// Deserialize a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if deserialization fails.
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        backend: BackendId,
        key: &str,
    ) -> StorageResult<Option<T>> {
        self.read(backend, key)
            .await?
            .map(|payload| decode_json(&payload))
            .transpose()
    }

    /// Serialize a value as JSON and store it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if serialization fails.
    pub async fn write_json<T: Serialize + Sync>(
        &self,
        backend: BackendId,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        let value = StoredValue::json(value)?;
        self.write(backend, key, value).await
    }
}

/// Builder for [`StorageFacade`].
#[derive(Debug, Default)]
pub struct StorageFacadeBuilder {
    facade: StorageFacade,
}

impl StorageFacadeBuilder {
    /// Register an adapter.
    #[must_use]
    pub fn with_adapter(mut self, adapter: impl StorageAdapter + 'static) -> Self {
        self.facade.register(Arc::new(adapter));
        self
    }

    /// Register an already-shared adapter.
    #[must_use]
    pub fn with_shared_adapter(mut self, adapter: Arc<dyn StorageAdapter>) -> Self {
        self.facade.register(adapter);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> StorageFacade {
        self.facade
    }
}
