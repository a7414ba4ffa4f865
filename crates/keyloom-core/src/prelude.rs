//! Prelude module - commonly used types for convenient import.
//!
//! Use `use keyloom_core::prelude::*;` to import all essential types.

pub use crate::backend::BackendId;
pub use crate::error::{ErrorKind, StorageError, StorageResult};
pub use crate::value::StoredValue;
