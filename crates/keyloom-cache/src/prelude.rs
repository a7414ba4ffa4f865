//! Prelude module - commonly used types for convenient import.
//!
//! Use `use keyloom_cache::prelude::*;` to import all essential types.

pub use crate::{CacheEntry, CacheKey, CacheStats, CacheSynchronizer, EntrySnapshot};
