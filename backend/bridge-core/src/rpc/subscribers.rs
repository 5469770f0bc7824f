//! Fan-out of pushed values to independently registered callbacks.

use log::error;

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SubscriberSet<T> {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback<T>>,
}

/// Registered callbacks run in registration order. A panicking callback is
/// logged and never prevents the others from running.
pub struct Subscribers<T> {
    inner: Arc<Mutex<SubscriberSet<T>>>,
}

impl<T> Clone for Subscribers<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(set: &Mutex<SubscriberSet<T>>) -> MutexGuard<'_, SubscriberSet<T>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: 'static> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubscriberSet {
                next_id: 0,
                callbacks: BTreeMap::new(),
            })),
        }
    }

    pub fn add<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut set = lock(&self.inner);
            let id = set.next_id;
            set.next_id += 1;
            set.callbacks.insert(id, Arc::new(callback));
            id
        };

        let weak: Weak<Mutex<SubscriberSet<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).callbacks.remove(&id);
            }
        })
    }

    /// Delivers `value` to a snapshot of the current subscribers and returns
    /// how many of them panicked.
    pub fn notify(&self, value: &T) -> usize {
        let snapshot: Vec<Callback<T>> = lock(&self.inner).callbacks.values().cloned().collect();

        let mut failures = 0;
        for callback in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(value))) {
                failures += 1;
                error!("Subscriber callback failed: {}", panic_message(panic.as_ref()));
            }
        }
        failures
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Handle returned by a subscribe call. Dropping it keeps the callback registered.
pub struct Subscription {
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Mutex::new(Some(Box::new(remove))),
        }
    }

    /// Idempotent.
    pub fn unsubscribe(&self) {
        let remove = self
            .remove
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(remove) = remove {
            remove();
        }
    }
}
