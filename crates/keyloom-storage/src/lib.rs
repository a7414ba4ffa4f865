//! Keyloom Storage: one asynchronous key-value contract over three backends.
//!
//! # Layers
//!
//! | Layer | Types |
//! |-------|-------|
//! | Primitive stores | [`RawStore`] ([`MemoryStore`], [`JsonFileStore`]), [`SecretStore`] ([`MemorySecretStore`]) |
//! | Key codec | [`KeyCodec`], [`Namespace`] |
//! | Backend adapters | [`StorageAdapter`]: [`FastStore`], [`DurableStore`], [`SecureStore`] |
//! | Facade | [`StorageFacade`] |
//!
//! Every adapter method is `async`, whether or not the primitive underneath
//! ever suspends. Callers never special-case a backend.
//!
//! # Backends
//!
//! | Operation | `fast` | `durable` | `secure` |
//! |-----------|--------|-----------|----------|
//! | `get` | absent → `None` | absent → `None` | allow-list checked |
//! | `set` | overwrite | overwrite | allow-list checked |
//! | `delete` | idempotent | idempotent | idempotent, allow-list checked |
//! | `list_keys` | own namespace only | whole store | `Unsupported` |
//! | `clear` | own namespace only | whole store | allow-listed keys only |
//!
//! # Feature Flags
//!
//! - **`kv`**: `SurrealKV` as a durable [`RawStore`]
//! - **`keychain`**: OS keychain as a [`SecretStore`]
//! - **`full`**: Both `kv` and `keychain`

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapter;
pub mod codec;
pub mod facade;
pub mod raw;
pub mod secret;

pub use adapter::{AllowList, DurableStore, FastStore, SecureStore, StorageAdapter};
pub use codec::{KeyCodec, Namespace, validate_key};
pub use facade::{StorageFacade, StorageFacadeBuilder};
pub use keyloom_core::{BackendId, ErrorKind, StorageError, StorageResult, StoredValue};
pub use raw::{JsonFileStore, MemoryStore, RawStore};
pub use secret::{MemorySecretStore, SecretStore};

#[cfg(feature = "kv")]
pub use raw::SurrealKvStore;

#[cfg(feature = "keychain")]
pub use secret::KeychainSecretStore;
