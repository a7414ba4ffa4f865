//! Change notifier: publish once, deliver to listeners and async receivers.

use std::sync::{Arc, Weak};

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::event::ChangeEvent;
use crate::subscriber::{ChangeListener, FnListener, ListenerId, ListenerRegistry};

/// Default capacity of the async broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Fan-out point for [`ChangeEvent`]s.
///
/// Clones share the same listeners and the same broadcast channel. A
/// listener must not hold a clone of the notifier it is registered on,
/// or the registry will never be freed; use a [`Subscription`] or a
/// separate channel instead.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<Arc<ChangeEvent>>,
    registry: Arc<ListenerRegistry>,
    capacity: usize,
}

impl ChangeNotifier {
    /// Create a notifier with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a notifier with a specific channel capacity (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: Arc::new(ListenerRegistry::new()),
            capacity,
        }
    }

    /// Publish an event.
    ///
    /// Async receivers get it first, then every synchronous listener runs
    /// in turn. Returns the number of async receivers that got it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let event = Arc::new(event);
        let count = if let Ok(c) = self.sender.send(Arc::clone(&event)) {
            debug!(event = %event.label(), receiver_count = c, "Change published");
            c
        } else {
            trace!(event = %event.label(), "No receivers for change");
            0
        };
        self.registry.notify(&event);
        count
    }

    /// Register a synchronous listener.
    ///
    /// The listener stays registered until the returned [`Subscription`]
    /// is dropped or explicitly unsubscribed.
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> Subscription {
        let id = self.registry.register(listener);
        Subscription {
            registry: Arc::downgrade(&self.registry),
            id: Some(id),
        }
    }

    /// Register a closure as a listener.
    pub fn subscribe_fn<F>(&self, name: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnListener::new(name, handler)))
    }

    /// Open an async receiver for every event published from now on.
    #[must_use]
    pub fn stream(&self) -> ChangeReceiver {
        ChangeReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of synchronous listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    /// Listeners plus open async receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .receiver_count()
            .saturating_add(self.registry.len())
    }

    /// Broadcast channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration of one synchronous listener.
///
/// Dropping the subscription unregisters the listener. Unsubscribing
/// twice, or after the notifier is gone, is harmless.
#[must_use = "dropping a Subscription unregisters its listener"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<ListenerRegistry>,
    id: Option<ListenerId>,
}

impl Subscription {
    /// The listener's registry handle.
    #[must_use]
    pub fn id(&self) -> Option<ListenerId> {
        self.id
    }

    /// Unregister now. Returns `true` if the listener was still registered.
    pub fn unsubscribe(mut self) -> bool {
        self.release()
    }

    /// Keep the listener registered for the notifier's lifetime.
    pub fn detach(mut self) {
        self.id = None;
    }

    fn release(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.unregister(id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Async receiver of change events.
pub struct ChangeReceiver {
    receiver: broadcast::Receiver<Arc<ChangeEvent>>,
}

impl ChangeReceiver {
    /// Receive the next event.
    ///
    /// A receiver that falls behind skips the dropped events with a warning.
    /// Returns `None` once every notifier clone is gone.
    pub async fn recv(&mut self) -> Option<Arc<ChangeEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Change receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive without waiting. `None` if nothing is queued.
    pub fn try_recv(&mut self) -> Option<Arc<ChangeEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Change receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

impl std::fmt::Debug for ChangeReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeReceiver")
            .field("queued", &self.receiver.len())
            .finish()
    }
}
