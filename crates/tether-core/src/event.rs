//! Synchronous publish/subscribe.
//!
//! Records and inboxes each own an [`EventBus`] and expose typed `on`
//! methods that delegate to it. Emitting snapshots the matching listeners
//! and releases the lock before calling them, so a listener may subscribe,
//! emit, or call back into the engine without deadlocking.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Listeners keyed by event name
pub struct EventBus<K, E> {
    listeners: Mutex<Vec<(K, Listener<E>)>>,
}

impl<K: PartialEq + Copy, E> EventBus<K, E> {
    /// Create a bus with no listeners
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener for `key`
    pub fn on<F>(&self, key: K, listener: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.listeners.lock().push((key, Arc::new(listener)));
    }

    /// Call every listener registered for `key`, in registration order
    pub fn emit(&self, key: K, event: &E) {
        let matching: Vec<Listener<E>> = self
            .listeners
            .lock()
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in matching {
            listener(event);
        }
    }

    /// Number of listeners registered for `key`
    pub fn listener_count(&self, key: K) -> usize {
        self.listeners.lock().iter().filter(|(k, _)| *k == key).count()
    }
}

impl<K: PartialEq + Copy, E> Default for EventBus<K, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, E> fmt::Debug for EventBus<K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}
