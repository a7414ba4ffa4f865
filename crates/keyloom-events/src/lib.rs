//! Keyloom Events - Change notifications for storage writes.
//!
//! This crate provides:
//! - [`ChangeEvent`]: one completed write or delete on a `(backend, key)`
//! - [`ChangeNotifier`]: fan-out to synchronous listeners and async receivers
//! - [`ListenerRegistry`]: the synchronous listener table behind the notifier
//!
//! Change events are observational. They are published only after a write
//! has taken effect in its backend and the cache has been invalidated, and
//! nothing in Keyloom reads them back as a source of truth.
//!
//! # Example
//!
//! ```rust
//! use keyloom_core::BackendId;
//! use keyloom_events::{ChangeEvent, ChangeNotifier};
//!
//! # async fn example() {
//! let notifier = ChangeNotifier::new();
//! let mut stream = notifier.stream();
//!
//! let _sub = notifier.subscribe_fn("inspector", |event| {
//!     println!("{} {}", event.backend, event.key);
//! });
//!
//! notifier.publish(ChangeEvent::set(BackendId::Fast, "demo_mmkv_value", Some("Hello".into())));
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.key, "demo_mmkv_value");
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod event;
mod notifier;
mod subscriber;

pub use event::{ChangeEvent, ChangeKind, EventMetadata};
pub use notifier::{ChangeNotifier, ChangeReceiver, DEFAULT_CHANNEL_CAPACITY, Subscription};
pub use subscriber::{ChangeListener, FnListener, ListenerId, ListenerRegistry};
