//! Per-key change notification.
//!
//! Subscribers register a callback for one [`CacheKey`] and are invoked
//! synchronously, in registration order, once per mutating
//! [`EntryStore`](super::EntryStore) call on that key. Dispatch iterates a
//! snapshot of the subscriber list taken before the first callback runs, so
//! a callback may unsubscribe itself or others without disturbing the
//! remainder of the dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use super::entry::CacheEntry;
use super::lock;
use crate::key::CacheKey;

type Callback<V> = Arc<dyn Fn(&CacheKey, &CacheEntry<V>) + Send + Sync>;

struct Registry<V> {
    next_id: u64,
    by_key: HashMap<CacheKey, Vec<(u64, Callback<V>)>>,
}

/// Registry of per-key subscribers.
pub struct Notifier<V> {
    inner: Arc<Mutex<Registry<V>>>,
}

impl<V> Clone for Notifier<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for Notifier<V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                by_key: HashMap::new(),
            })),
        }
    }
}

impl<V: 'static> Notifier<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for changes to `key`.
    ///
    /// The registration lives until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, key: CacheKey, callback: F) -> Subscription
    where
        F: Fn(&CacheKey, &CacheEntry<V>) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.inner);
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .by_key
                .entry(key.clone())
                .or_default()
                .push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Registry<V>>> = Arc::downgrade(&self.inner);
        Subscription {
            key_label: key.to_string(),
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut registry = lock(&inner);
                    if let Some(subs) = registry.by_key.get_mut(&key) {
                        subs.retain(|(sub_id, _)| *sub_id != id);
                        if subs.is_empty() {
                            registry.by_key.remove(&key);
                        }
                    }
                }
            })),
        }
    }

    /// Invoke every subscriber of `key` with the entry's new state.
    pub fn notify(&self, key: &CacheKey, entry: &CacheEntry<V>) {
        let snapshot: Vec<Callback<V>> = {
            let registry = lock(&self.inner);
            match registry.by_key.get(key) {
                Some(subs) => subs.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => return,
            }
        };
        for callback in snapshot {
            callback(key, entry);
        }
    }

    /// Number of live subscriptions for `key`.
    pub fn subscriber_count(&self, key: &CacheKey) -> usize {
        lock(&self.inner).by_key.get(key).map_or(0, Vec::len)
    }
}

/// Handle for one registered callback.
///
/// Dropping the handle unsubscribes; call [`detach`](Self::detach) to keep
/// the callback registered for the lifetime of the notifier.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    key_label: String,
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Remove the callback now.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Keep the callback registered without holding the handle.
    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key_label)
            .field("active", &self.remove.is_some())
            .finish()
    }
}
