//! Keyloom Core: shared vocabulary for the unified storage layer.
//!
//! Every other Keyloom crate speaks in terms of the types defined here:
//!
//! - [`BackendId`]: the closed set of storage backends (`fast`, `durable`, `secure`)
//! - [`StorageError`] / [`ErrorKind`]: the storage error taxonomy
//! - [`StoredValue`]: typed input coerced to the string payload every backend persists
//!
//! This crate has no async or I/O code. It only depends on `serde`,
//! `serde_json`, and `thiserror`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod backend;
pub mod error;
pub mod prelude;
pub mod value;

pub use backend::BackendId;
pub use error::{ErrorKind, StorageError, StorageResult};
pub use value::StoredValue;
