//! Synchronous change listeners and their registry.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::event::ChangeEvent;

/// Trait for synchronous change listeners.
///
/// `on_change` runs on the publishing task, after the write has completed.
/// It should return quickly; use [`ChangeReceiver`](crate::ChangeReceiver)
/// for anything slow.
pub trait ChangeListener: Send + Sync {
    /// Called once per published event the listener accepts.
    fn on_change(&self, event: &ChangeEvent);

    /// Return `false` to skip an event. Accepts everything by default.
    fn accepts(&self, event: &ChangeEvent) -> bool {
        let _ = event;
        true
    }

    /// Name used in logs.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Table of synchronous listeners, kept in registration order.
///
/// A poisoned lock is recovered rather than propagated: the map is never
/// left half-updated by any operation here.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn ChangeListener>)>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn register(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId::new();
        let name = listener.name().to_string();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        debug!(listener_name = %name, "Listener registered");
        id
    }

    /// Unregister a listener. Returns `true` if it was present.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let position = listeners.iter().position(|(registered, _)| *registered == id);
        if let Some(index) = position {
            listeners.remove(index);
        }
        drop(listeners);
        let removed = position.is_some();
        if removed {
            debug!("Listener unregistered");
        }
        removed
    }

    /// Deliver `event` to every listener registered at call time, in the
    /// order they were registered.
    ///
    /// The listener set is snapshotted before delivery, so a listener may
    /// unsubscribe itself (or others) from inside `on_change`. A listener
    /// that panics is logged and skipped; the rest still run.
    pub fn notify(&self, event: &ChangeEvent) {
        let snapshot: Vec<(ListenerId, Arc<dyn ChangeListener>)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();

        for (id, listener) in snapshot {
            if !listener.accepts(event) {
                continue;
            }
            trace!(
                listener_name = %listener.name(),
                event = %event.label(),
                "Notifying listener"
            );
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_change(event);
            }));
            if let Err(e) = result {
                warn!(
                    listener_id = ?id,
                    listener_name = %listener.name(),
                    error = ?e,
                    "Listener panicked"
                );
            }
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("All listeners cleared");
    }
}

/// Listener backed by a closure.
pub struct FnListener<F>
where
    F: Fn(&ChangeEvent) + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> FnListener<F>
where
    F: Fn(&ChangeEvent) + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> ChangeListener for FnListener<F>
where
    F: Fn(&ChangeEvent) + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent) {
        (self.handler)(event);
    }

    fn name(&self) -> &str {
        &self.name
    }
}
