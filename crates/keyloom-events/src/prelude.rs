//! Prelude module - commonly used types for convenient import.
//!
//! Use `use keyloom_events::prelude::*;` to import all essential types.

// Notifier
pub use crate::{ChangeNotifier, ChangeReceiver, DEFAULT_CHANNEL_CAPACITY, Subscription};

// Events
pub use crate::{ChangeEvent, ChangeKind, EventMetadata};

// Listeners
pub use crate::{ChangeListener, FnListener, ListenerId, ListenerRegistry};
