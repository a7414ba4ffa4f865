//! Behavioural properties of the storage facade across all three backends.

use std::sync::Arc;

use keyloom_storage::{
    BackendId, DurableStore, ErrorKind, FastStore, JsonFileStore, KeyCodec, MemoryStore,
    Namespace, RawStore, StorageAdapter, StorageError, StorageFacade, StoredValue,
};
use keyloom_test::{FailingStore, memory_facade, memory_facade_with};

const WRITABLE: [(BackendId, &str); 3] = [
    (BackendId::Fast, "demo_mmkv_value"),
    (BackendId::Durable, "demo_async_value"),
    (BackendId::Secure, "userToken"),
];

#[tokio::test]
async fn test_round_trip_on_every_backend() {
    let facade = memory_facade();
    let values = [
        StoredValue::from("plain text"),
        StoredValue::from(""),
        StoredValue::from(0.1 + 0.2),
        StoredValue::from(-17_i64),
        StoredValue::from(false),
        StoredValue::from(serde_json::json!({"nested": [1, "two", null]})),
    ];

    for (backend, key) in WRITABLE {
        for value in &values {
            let expected = value.clone().into_payload().unwrap();
            facade.write(backend, key, value.clone()).await.unwrap();
            assert_eq!(
                facade.read(backend, key).await.unwrap(),
                Some(expected),
                "{backend}/{key}"
            );
        }
    }
}

#[tokio::test]
async fn test_typed_values_survive_round_trip() {
    let facade = memory_facade();
    let x = 0.1 + 0.2;
    facade.write(BackendId::Durable, "n", x).await.unwrap();
    let back = facade.read_number(BackendId::Durable, "n").await.unwrap().unwrap();
    assert_eq!(back.to_bits(), x.to_bits());

    facade.write(BackendId::Fast, "flag", true).await.unwrap();
    assert_eq!(facade.read_bool(BackendId::Fast, "flag").await.unwrap(), Some(true));
}

#[tokio::test]
async fn test_delete_is_idempotent_everywhere() {
    let facade = memory_facade();
    for (backend, key) in WRITABLE {
        facade.remove(backend, key).await.unwrap();
        facade.remove(backend, key).await.unwrap();
        assert!(facade.read(backend, key).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_namespace_isolation_on_shared_store() {
    let shared: Arc<dyn RawStore> = Arc::new(MemoryStore::new());
    let ns_a = Namespace::new("a").unwrap();
    let ns_b = Namespace::new("b").unwrap();
    let codec = KeyCodec::new([ns_a.clone(), ns_b.clone()]);
    let a = FastStore::with_codec(Arc::clone(&shared), ns_a, codec.clone());
    let b = FastStore::with_codec(Arc::clone(&shared), ns_b, codec);

    a.set("k", "from-a".into()).await.unwrap();
    b.set("k", "from-b".into()).await.unwrap();
    b.set("only-b", "x".into()).await.unwrap();
    shared.set_item("foreign-entry", "noise".into()).await.unwrap();

    assert_eq!(a.get("k").await.unwrap().as_deref(), Some("from-a"));
    assert_eq!(a.list_keys().await.unwrap(), vec!["k"]);

    assert_eq!(a.clear().await.unwrap(), vec!["k"]);
    assert_eq!(b.get("k").await.unwrap().as_deref(), Some("from-b"));
    assert_eq!(b.list_keys().await.unwrap(), vec!["k", "only-b"]);
    assert_eq!(
        shared.get_item("foreign-entry").await.unwrap().as_deref(),
        Some("noise")
    );
}

#[tokio::test]
async fn test_secure_policy_leaves_store_untouched() {
    let facade = memory_facade();
    for key in ["apiKey", "usertoken", "userToken "] {
        let err = facade.write(BackendId::Secure, key, "v").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
        assert!(err.is_policy());
        assert!(!err.is_transient());
    }
    assert!(facade.read(BackendId::Secure, "userToken").await.unwrap().is_none());
}

#[tokio::test]
async fn test_scenario_fast_write_then_read() {
    let facade = memory_facade();
    facade
        .write(BackendId::Fast, "demo_mmkv_value", "Hello")
        .await
        .unwrap();
    assert_eq!(
        facade.read(BackendId::Fast, "demo_mmkv_value").await.unwrap().as_deref(),
        Some("Hello")
    );
}

#[tokio::test]
async fn test_scenario_secure_write_remove_remove() {
    let facade = memory_facade();
    facade.write(BackendId::Secure, "userToken", "tok-1").await.unwrap();
    facade.remove(BackendId::Secure, "userToken").await.unwrap();
    assert!(facade.read(BackendId::Secure, "userToken").await.unwrap().is_none());
    facade.remove(BackendId::Secure, "userToken").await.unwrap();
}

#[tokio::test]
async fn test_scenario_secure_enumeration_unsupported() {
    let facade = memory_facade();
    let err = facade.enumerate(BackendId::Secure).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    facade.write(BackendId::Secure, "userToken", "tok-1").await.unwrap();
    let err = facade.enumerate(BackendId::Secure).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[tokio::test]
async fn test_unavailable_store_propagates_and_is_transient() {
    let failing = Arc::new(FailingStore::new());
    let facade = memory_facade_with(
        Arc::clone(&failing) as Arc<dyn RawStore>,
        Arc::new(MemoryStore::new()),
    );
    failing.set_fail_all(true);

    for err in [
        facade.read(BackendId::Fast, "k").await.unwrap_err(),
        facade.write(BackendId::Fast, "k", "v").await.unwrap_err(),
        facade.remove(BackendId::Fast, "k").await.unwrap_err(),
        facade.enumerate(BackendId::Fast).await.unwrap_err(),
        facade.reset(BackendId::Fast).await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert!(err.is_transient());
    }

    failing.set_fail_all(false);
    facade.write(BackendId::Fast, "k", "v").await.unwrap();
    assert_eq!(facade.read(BackendId::Fast, "k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn test_invalid_key_rejected_before_store() {
    let failing = Arc::new(FailingStore::new());
    let facade = memory_facade_with(
        Arc::new(MemoryStore::new()),
        Arc::clone(&failing) as Arc<dyn RawStore>,
    );
    for key in ["", "nul\0key"] {
        assert!(matches!(
            facade.write(BackendId::Durable, key, "v").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
    assert_eq!(failing.calls(), 0);
}

#[tokio::test]
async fn test_durable_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("durable").join("store.json");

    {
        let store = JsonFileStore::open(&path).await.unwrap();
        let facade = StorageFacade::builder()
            .with_adapter(DurableStore::new(Arc::new(store)))
            .build();
        facade.write(BackendId::Durable, "demo_async_value", "Hello").await.unwrap();
        facade.write(BackendId::Durable, "count", 3_i64).await.unwrap();
    }

    let store = JsonFileStore::open(&path).await.unwrap();
    let facade = StorageFacade::builder()
        .with_adapter(DurableStore::new(Arc::new(store)))
        .build();
    assert_eq!(
        facade.enumerate(BackendId::Durable).await.unwrap(),
        vec!["count", "demo_async_value"]
    );
    assert_eq!(facade.read_number(BackendId::Durable, "count").await.unwrap(), Some(3.0));
}
