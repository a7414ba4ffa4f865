//! Test fixtures for common types.

use std::sync::Arc;

use keyloom_storage::{
    AllowList, DurableStore, FastStore, MemorySecretStore, MemoryStore, Namespace, RawStore,
    SecureStore, StorageFacade,
};

/// Namespace used by the fast store in fixtures.
pub const TEST_NAMESPACE: &str = "rn-dev-tools-example";

/// The fixture namespace.
///
/// # Panics
///
/// Never, `TEST_NAMESPACE` is a valid namespace.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_namespace() -> Namespace {
    Namespace::new(TEST_NAMESPACE).expect("fixture namespace is valid")
}

/// The allow-list used by the secure store in fixtures: `userToken` only.
///
/// # Panics
///
/// Never, the fixture key is valid.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_allow_list() -> AllowList {
    AllowList::new(["userToken"]).expect("fixture allow-list is valid")
}

/// A facade with all three backends over fresh in-memory stores.
#[must_use]
pub fn memory_facade() -> StorageFacade {
    memory_facade_with(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
}

/// A facade whose fast and durable backends sit on the given raw stores.
///
/// Use this to put a [`FailingStore`](crate::FailingStore) or
/// [`GatedStore`](crate::GatedStore) under one backend.
#[must_use]
pub fn memory_facade_with(fast: Arc<dyn RawStore>, durable: Arc<dyn RawStore>) -> StorageFacade {
    StorageFacade::builder()
        .with_adapter(FastStore::new(fast, test_namespace()))
        .with_adapter(DurableStore::new(durable))
        .with_adapter(SecureStore::new(
            Arc::new(MemorySecretStore::new()),
            test_allow_list(),
        ))
        .build()
}
