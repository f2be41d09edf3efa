//! Entry store: the single owner of cache entry state.
//!
//! Every mutating method applies its change under the store lock, releases
//! the lock, then notifies the key's subscribers exactly once with the
//! resulting entry. Subscribers therefore never observe partial state and
//! may call back into the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::time::Instant;
use tracing::debug;

use super::entry::{CacheEntry, FetchStatus, RequestId};
use super::lock;
use super::notify::{Notifier, Subscription};
use crate::key::CacheKey;
use crate::{CacheError, Result};

/// Thread-safe map from [`CacheKey`] to [`CacheEntry`].
///
/// Cloning yields another handle to the same entries. There is no eviction
/// policy: entries live until [`evict`](Self::evict) or until the last
/// handle is dropped.
pub struct EntryStore<V> {
    entries: Arc<Mutex<HashMap<CacheKey, CacheEntry<V>>>>,
    notifier: Notifier<V>,
}

impl<V> Clone for EntryStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            notifier: self.notifier.clone(),
        }
    }
}

impl<V: Clone + 'static> Default for EntryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + 'static> EntryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            notifier: Notifier::new(),
        }
    }

    /// Snapshot of the entry for `key`, or `None` if never requested.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        lock(&self.entries).get(key).cloned()
    }

    /// Record a successful fetch. Overwrites any previous value.
    pub fn put(&self, key: &CacheKey, value: V) {
        self.mutate(key, |entry| {
            entry.value = Some(value);
            entry.status = FetchStatus::Success;
            entry.last_success_at = Some(Instant::now());
            entry.last_error = None;
            entry.in_flight = None;
            Ok(())
        })
        .ok();
    }

    /// Mark `key` as being fetched by `request_id`.
    ///
    /// Fails with [`CacheError::AlreadyPending`] if a different request is
    /// already in flight for the key.
    pub fn mark_pending(&self, key: &CacheKey, request_id: RequestId) -> Result<()> {
        self.mutate(key, |entry| {
            if let Some(in_flight) = entry.in_flight
                && entry.status == FetchStatus::Pending
                && in_flight != request_id
            {
                return Err(CacheError::AlreadyPending {
                    key: key.to_string(),
                    in_flight,
                    requested: request_id,
                });
            }
            entry.status = FetchStatus::Pending;
            entry.in_flight = Some(request_id);
            Ok(())
        })
    }

    /// Record a failed fetch. The previous value and success timestamp are
    /// kept so callers can still show stale data.
    pub fn mark_error(&self, key: &CacheKey, error: CacheError) {
        self.mutate(key, |entry| {
            entry.status = FetchStatus::Error;
            entry.last_error = Some(error);
            entry.in_flight = None;
            Ok(())
        })
        .ok();
    }

    /// Record `error` for a fetch that ended without an outcome, but only if
    /// `request_id` still owns the pending entry. Returns whether it did.
    pub fn abandon(&self, key: &CacheKey, request_id: RequestId, error: CacheError) -> bool {
        let snapshot = {
            let mut entries = lock(&self.entries);
            match entries.get_mut(key) {
                Some(entry) if entry.in_flight == Some(request_id) => {
                    entry.status = FetchStatus::Error;
                    entry.last_error = Some(error);
                    entry.in_flight = None;
                    entry.clone()
                }
                _ => return false,
            }
        };
        self.notifier.notify(key, &snapshot);
        true
    }

    /// Force `key` back to [`FetchStatus::Idle`]. The value is kept.
    ///
    /// Returns `false` (and notifies nobody) if the key has no entry.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.mutate_existing(key, |entry| {
            entry.status = FetchStatus::Idle;
            entry.in_flight = None;
            entry.last_error = None;
        })
    }

    /// Drop the stored value and success timestamp without touching status.
    pub fn clear_value(&self, key: &CacheKey) -> bool {
        self.mutate_existing(key, |entry| {
            entry.value = None;
            entry.last_success_at = None;
        })
    }

    /// Remove the entry entirely. Subscribers see an empty idle entry.
    pub fn evict(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        let removed = lock(&self.entries).remove(key);
        if removed.is_some() {
            debug!(key = %key, "evicted cache entry");
            self.notifier.notify(key, &CacheEntry::default());
        }
        removed
    }

    /// Register a change callback for `key`. See [`Notifier::subscribe`].
    pub fn subscribe<F>(&self, key: CacheKey, callback: F) -> Subscription
    where
        F: Fn(&CacheKey, &CacheEntry<V>) + Send + Sync + 'static,
    {
        self.notifier.subscribe(key, callback)
    }

    pub fn notifier(&self) -> &Notifier<V> {
        &self.notifier
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        lock(&self.entries).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to the (possibly new) entry for `key` and notify on success.
    fn mutate<F>(&self, key: &CacheKey, f: F) -> Result<()>
    where
        F: FnOnce(&mut CacheEntry<V>) -> Result<()>,
    {
        let snapshot = {
            let mut entries = lock(&self.entries);
            let entry = entries.entry(key.clone()).or_default();
            f(entry)?;
            entry.clone()
        };
        self.notifier.notify(key, &snapshot);
        Ok(())
    }

    fn mutate_existing<F>(&self, key: &CacheKey, f: F) -> bool
    where
        F: FnOnce(&mut CacheEntry<V>),
    {
        let snapshot = {
            let mut entries = lock(&self.entries);
            let Some(entry) = entries.get_mut(key) else {
                return false;
            };
            f(entry);
            entry.clone()
        };
        self.notifier.notify(key, &snapshot);
        true
    }
}
