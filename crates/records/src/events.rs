//! Explicit publish-subscribe with owned subscription tokens.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
    next_id: u64,
    subscribers: Vec<(u64, Callback<E>)>,
}

/// Synchronous event fan-out. Callbacks run on the emitting call stack, in
/// subscription order, against a snapshot of the subscriber list, so a
/// callback may subscribe or unsubscribe without deadlocking the emitter.
pub struct Emitter<E> {
    inner: Arc<Mutex<Registry<E>>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Registers `callback` and returns the owned token that keeps it alive.
    pub fn on(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> Subscription
    where
        E: 'static,
    {
        let id = {
            let mut registry = lock(&self.inner);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.push((id, Arc::new(callback)));
            id
        };

        let weak = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner).subscribers.retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = lock(&self.inner)
            .subscribers
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }

    /// Drops every subscriber. Used once a record is destroyed so nothing
    /// can fire after the terminal notification.
    pub fn clear(&self) {
        lock(&self.inner).subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owned subscription handle. Dropping it (or calling [`Subscription::off`])
/// removes the callback from its emitter.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn off(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
