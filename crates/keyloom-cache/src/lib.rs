//! Keyloom Cache - Read-through cache kept coherent with writes.
//!
//! [`CacheSynchronizer`] sits above a [`StorageFacade`](keyloom_storage::StorageFacade):
//!
//! - `cached_read` serves a cached value or fetches and caches it
//! - `write`, `remove` and `reset` go to the backend, evict the affected
//!   entries, then publish a [`ChangeEvent`](keyloom_events::ChangeEvent)
//!
//! A read issued after a write has completed never observes a value from
//! before that write. Entries are evicted rather than overwritten, and a
//! fetch that overlapped an invalidation is not committed (see [`table`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use keyloom_cache::CacheSynchronizer;
//! use keyloom_core::BackendId;
//! use keyloom_events::ChangeNotifier;
//!
//! let sync = CacheSynchronizer::new(facade, ChangeNotifier::new());
//! sync.write(BackendId::Durable, "demo_async_value", "Hello").await?;
//! let value = sync.cached_read(BackendId::Durable, "demo_async_value").await?;
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;
pub mod table;

mod entry;
mod sync;

pub use entry::{CacheEntry, CacheKey, CacheStats, EntrySnapshot};
pub use sync::CacheSynchronizer;
pub use table::{CacheTable, Ticket};
