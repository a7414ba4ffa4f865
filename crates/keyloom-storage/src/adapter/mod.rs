//! Backend adapters.
//!
//! The [`StorageAdapter`] trait is the one capability set every backend
//! exposes. Each adapter wraps exactly one primitive store and owns no
//! mutable state beyond its namespace or allow-list, both fixed at
//! construction.

mod durable;
mod fast;
mod secure;

use async_trait::async_trait;
use keyloom_core::{BackendId, StorageResult, StoredValue};

pub use durable::DurableStore;
pub use fast::FastStore;
pub use secure::{AllowList, SecureStore};

/// Uniform asynchronous key-value contract implemented by every backend.
#[async_trait]
pub trait StorageAdapter: Send + Sync + std::fmt::Debug {
    /// Which backend this adapter serves.
    fn backend(&self) -> BackendId;

    /// Read a value. A missing key is `Ok(None)`, never an error.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, overwriting any existing one. Non-text values are
    /// coerced to their string payload here.
    async fn set(&self, key: &str, value: StoredValue) -> StorageResult<()>;

    /// Delete a key. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List the logical keys this adapter can see.
    async fn list_keys(&self) -> StorageResult<Vec<String>>;

    /// Delete every key this adapter owns, returning the keys removed.
    async fn clear(&self) -> StorageResult<Vec<String>>;
}
