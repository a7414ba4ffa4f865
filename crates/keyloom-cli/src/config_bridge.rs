//! Bridge from `keyloom_config::Config` to storage and telemetry types.
//!
//! The config crate knows nothing about storage. Everything that turns a
//! section into a live adapter lives here.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use keyloom_cache::CacheSynchronizer;
use keyloom_config::{Config, DurableEngine, FastEngine, SecureEngine};
use keyloom_core::BackendId;
use keyloom_events::ChangeNotifier;
use keyloom_storage::{
    AllowList, DurableStore, FastStore, JsonFileStore, MemorySecretStore, MemoryStore, Namespace,
    RawStore, SecretStore, SecureStore, StorageFacade,
};
use keyloom_telemetry::LogConfig;
use tracing::debug;

/// File holding the fast backend's physical store.
pub(crate) const FAST_FILE: &str = "fast.json";
/// File holding the durable backend's store.
pub(crate) const DURABLE_FILE: &str = "durable.json";
/// Directory holding the durable backend's `SurrealKV` tree.
#[cfg_attr(not(feature = "kv"), allow(dead_code))]
pub(crate) const DURABLE_KV_DIR: &str = "durable.kv";

/// Logging config from the `[logging]` section, with `-v` raising the level.
pub(crate) fn to_log_config(config: &Config, verbose: u8) -> Result<LogConfig> {
    let mut log_config = LogConfig::from_section(&config.logging)?;
    if verbose > 0 {
        log_config.level = LogConfig::from_verbosity(verbose).level;
    }
    Ok(log_config)
}

fn namespace(config: &Config) -> Result<Namespace> {
    Namespace::new(config.fast.namespace.as_str())
        .with_context(|| format!("fast.namespace '{}'", config.fast.namespace))
}

fn allow_list(config: &Config) -> Result<AllowList> {
    AllowList::new(config.secure.allow_list.iter().cloned()).context("secure.allow_list")
}

async fn fast_store(config: &Config, data_dir: &Path) -> Result<Arc<dyn RawStore>> {
    let store: Arc<dyn RawStore> = match config.fast.engine {
        FastEngine::Memory => Arc::new(MemoryStore::new()),
        FastEngine::File => Arc::new(JsonFileStore::open(data_dir.join(FAST_FILE)).await?),
    };
    Ok(store)
}

async fn durable_store(config: &Config, data_dir: &Path) -> Result<Arc<dyn RawStore>> {
    let store: Arc<dyn RawStore> = match config.durable.engine {
        DurableEngine::Memory => Arc::new(MemoryStore::new()),
        DurableEngine::File => Arc::new(JsonFileStore::open(data_dir.join(DURABLE_FILE)).await?),
        #[cfg(feature = "kv")]
        DurableEngine::Surrealkv => {
            let path = data_dir.join(DURABLE_KV_DIR);
            tokio::fs::create_dir_all(&path)
                .await
                .with_context(|| format!("creating {}", path.display()))?;
            Arc::new(keyloom_storage::SurrealKvStore::open(path)?)
        },
        #[cfg(not(feature = "kv"))]
        DurableEngine::Surrealkv => {
            anyhow::bail!("durable.engine = \"surrealkv\" requires building with the `kv` feature")
        },
    };
    Ok(store)
}

fn secret_store(config: &Config) -> Result<Arc<dyn SecretStore>> {
    let store: Arc<dyn SecretStore> = match config.secure.engine {
        SecureEngine::Memory => Arc::new(MemorySecretStore::new()),
        #[cfg(feature = "keychain")]
        SecureEngine::Keychain => Arc::new(keyloom_storage::KeychainSecretStore::new(
            config.secure.service.clone(),
        )),
        #[cfg(not(feature = "keychain"))]
        SecureEngine::Keychain => anyhow::bail!(
            "secure.engine = \"keychain\" requires building with the `keychain` feature"
        ),
    };
    Ok(store)
}

/// Build the facade the configuration describes.
///
/// On-disk engines keep their files under the configured data directory.
pub(crate) async fn build_facade(config: &Config) -> Result<StorageFacade> {
    let data_dir = config.data_dir()?;
    debug!(data_dir = %data_dir.display(), "building storage facade");

    let fast = FastStore::new(fast_store(config, &data_dir).await?, namespace(config)?);
    let durable = DurableStore::new(durable_store(config, &data_dir).await?);
    let secure = SecureStore::new(secret_store(config)?, allow_list(config)?);

    Ok(StorageFacade::builder()
        .with_adapter(fast)
        .with_adapter(durable)
        .with_adapter(secure)
        .build())
}

/// A facade over fresh in-memory stores, keeping the configured namespace
/// and allow-list.
pub(crate) fn memory_facade(config: &Config) -> Result<StorageFacade> {
    Ok(StorageFacade::builder()
        .with_adapter(FastStore::new(Arc::new(MemoryStore::new()), namespace(config)?))
        .with_adapter(DurableStore::new(Arc::new(MemoryStore::new())))
        .with_adapter(SecureStore::new(
            Arc::new(MemorySecretStore::new()),
            allow_list(config)?,
        ))
        .build())
}

/// Wrap `facade` in a synchronizer that keeps secure values out of events.
pub(crate) fn synchronizer(config: &Config, facade: StorageFacade) -> CacheSynchronizer {
    let notifier = ChangeNotifier::with_capacity(config.events.channel_capacity);
    CacheSynchronizer::new(facade, notifier).with_redacted_backend(BackendId::Secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.to_path_buf());
        config
    }

    #[test]
    fn test_verbose_overrides_level() {
        let config = Config::default();
        assert_eq!(to_log_config(&config, 0).unwrap().level, "warn");
        assert_eq!(to_log_config(&config, 2).unwrap().level, "debug");
    }

    #[tokio::test]
    async fn test_file_engines_persist_across_builds() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(dir.path());

        let facade = build_facade(&config).await.unwrap();
        facade.write(BackendId::Fast, "demo_mmkv_value", "Hello").await.unwrap();
        facade.write(BackendId::Durable, "k", "v").await.unwrap();
        drop(facade);

        assert!(dir.path().join(FAST_FILE).exists());
        assert!(dir.path().join(DURABLE_FILE).exists());

        let facade = build_facade(&config).await.unwrap();
        assert_eq!(
            facade.read(BackendId::Fast, "demo_mmkv_value").await.unwrap().as_deref(),
            Some("Hello")
        );
        assert_eq!(facade.read(BackendId::Durable, "k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_fast_and_durable_do_not_share_a_store() {
        let dir = tempfile::tempdir().unwrap();
        let facade = build_facade(&file_config(dir.path())).await.unwrap();
        facade.write(BackendId::Fast, "a", "1").await.unwrap();
        facade.write(BackendId::Durable, "b", "2").await.unwrap();
        assert_eq!(facade.enumerate(BackendId::Fast).await.unwrap(), vec!["a"]);
        assert_eq!(facade.enumerate(BackendId::Durable).await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_configured_allow_list_is_enforced() {
        let mut config = Config::default();
        config.secure.allow_list = vec!["refreshToken".to_owned()];
        let facade = memory_facade(&config).unwrap();

        facade.write(BackendId::Secure, "refreshToken", "r").await.unwrap();
        let err = facade.write(BackendId::Secure, "userToken", "t").await.unwrap_err();
        assert!(err.is_policy());
    }

    #[test]
    fn test_bad_namespace_is_rejected() {
        let mut config = Config::default();
        config.fast.namespace = "bad\0ns".to_owned();
        assert!(memory_facade(&config).is_err());
    }

    #[cfg(not(feature = "kv"))]
    #[tokio::test]
    async fn test_surrealkv_without_feature_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = file_config(dir.path());
        config.durable.engine = DurableEngine::Surrealkv;
        let err = build_facade(&config).await.unwrap_err();
        assert!(err.to_string().contains("`kv` feature"));
    }

    #[tokio::test]
    async fn test_synchronizer_redacts_secure_events() {
        let config = Config::default();
        let sync = synchronizer(&config, memory_facade(&config).unwrap());
        let mut stream = sync.notifier().stream();

        sync.write(BackendId::Secure, "userToken", "tok-1").await.unwrap();
        let event = stream.try_recv().unwrap();
        assert_eq!(event.key, "userToken");
        assert!(event.new_value.is_none());
        assert_eq!(sync.notifier().capacity(), config.events.channel_capacity);
    }
}
