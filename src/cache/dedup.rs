//! At most one outstanding fetch per key.
//!
//! The first [`request`](FetchDeduplicator::request) for a key marks the
//! entry pending, spawns the fetch on the tokio runtime and publishes its
//! outcome through a shared oneshot receiver. Every request for the same key
//! issued before that outcome is recorded joins the receiver instead of
//! starting a second fetch, so all callers observe the identical value or
//! identical error.
//!
//! The fetch runs in its own task: it completes (and updates the store) even
//! if every caller stops waiting. If the task itself is dropped unfinished,
//! for instance because its runtime shut down, the entry is marked with
//! [`CacheError::Cancelled`] so the next request can fetch again.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::oneshot;
use tracing::debug;

use super::entry::RequestId;
use super::lock;
use super::store::EntryStore;
use crate::key::CacheKey;
use crate::telemetry;
use crate::{CacheError, Result};

type SharedOutcome<V> = Shared<BoxFuture<'static, Result<V>>>;

struct InFlight<V> {
    id: RequestId,
    outcome: SharedOutcome<V>,
}

type InFlightMap<V> = Arc<Mutex<HashMap<CacheKey, InFlight<V>>>>;

/// Collapses concurrent fetches of the same key into one.
pub struct FetchDeduplicator<V> {
    store: EntryStore<V>,
    in_flight: InFlightMap<V>,
    next_id: Arc<AtomicU64>,
}

impl<V> Clone for FetchDeduplicator<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            in_flight: Arc::clone(&self.in_flight),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> FetchDeduplicator<V> {
    pub fn new(store: EntryStore<V>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Fetch `key` with `fetch`, or join the fetch already in flight.
    ///
    /// On completion the store receives exactly one `put` or `mark_error`.
    /// A panic while building or polling the fetch future is reported as
    /// [`CacheError::FetchPanicked`] and recorded like any other failure.
    pub async fn request<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let outcome = self.join_or_start(key, fetch)?;
        outcome.await
    }

    /// Number of keys with a fetch currently in flight.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Whether `key` has a fetch in flight.
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        lock(&self.in_flight).contains_key(key)
    }

    fn join_or_start<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<SharedOutcome<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (id, tx, outcome) = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(existing) = in_flight.get(key) {
                debug!(key = %key, request = %existing.id, "joining in-flight fetch");
                metrics::counter!(telemetry::DEDUP_JOINS_TOTAL, "kind" => key.kind().to_string())
                    .increment(1);
                return Ok(existing.outcome.clone());
            }

            let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
            let (tx, rx) = oneshot::channel::<Result<V>>();
            let outcome: SharedOutcome<V> = rx
                .map(|received| received.unwrap_or(Err(CacheError::Cancelled)))
                .boxed()
                .shared();
            in_flight.insert(
                key.clone(),
                InFlight {
                    id,
                    outcome: outcome.clone(),
                },
            );
            (id, tx, outcome)
        };

        let mut guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            store: self.store.clone(),
            key: key.clone(),
            id,
            recorded: false,
        };

        if let Err(e) = self.store.mark_pending(key, id) {
            // The entry belongs to another request; leave it alone.
            guard.recorded = true;
            drop(guard);
            let _ = tx.send(Err(e.clone()));
            return Err(e);
        }

        debug!(key = %key, request = %id, "starting fetch");
        let store = self.store.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let mut guard = guard;
            let result = match AssertUnwindSafe(async move { fetch().await })
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => Err(CacheError::FetchPanicked(panic_message(panic.as_ref()))),
            };

            let status = if result.is_ok() { "ok" } else { "error" };
            metrics::counter!(telemetry::FETCHES_TOTAL,
                "kind" => key.kind().to_string(),
                "status" => status,
            )
            .increment(1);

            match &result {
                Ok(value) => store.put(&key, value.clone()),
                Err(e) => {
                    debug!(key = %key, request = %id, error = %e, "fetch failed");
                    store.mark_error(&key, e.clone());
                }
            }
            // Leave the in-flight slot only after the store is updated, so a
            // new request either joins this outcome or sees the new entry.
            guard.recorded = true;
            drop(guard);
            let _ = tx.send(result);
        });

        Ok(outcome)
    }
}

/// Removes a key's in-flight slot when dropped, if it still belongs to `id`.
///
/// Dropped before `recorded` is set, it also marks the entry cancelled.
struct InFlightGuard<V: Clone + 'static> {
    in_flight: InFlightMap<V>,
    store: EntryStore<V>,
    key: CacheKey,
    id: RequestId,
    recorded: bool,
}

impl<V: Clone + 'static> Drop for InFlightGuard<V> {
    fn drop(&mut self) {
        if !self.recorded
            && self.store.abandon(&self.key, self.id, CacheError::Cancelled)
        {
            debug!(key = %self.key, request = %self.id, "fetch dropped before completing");
        }
        let mut in_flight = lock(&self.in_flight);
        if in_flight.get(&self.key).is_some_and(|f| f.id == self.id) {
            in_flight.remove(&self.key);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FetchStatus;
    use crate::key::{Params, make_key};
    use std::sync::atomic::AtomicUsize;

    fn key(name: &str) -> CacheKey {
        make_key("pokemon", name, Params::new()).unwrap()
    }

    #[tokio::test]
    async fn single_request_records_success() {
        let store = EntryStore::new();
        let dedup = FetchDeduplicator::new(store.clone());
        let value = dedup
            .request(&key("a"), || async { Ok("data".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "data");
        let entry = store.get(&key("a")).unwrap();
        assert_eq!(entry.status(), FetchStatus::Success);
        assert_eq!(dedup.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn failure_is_recorded_and_returned() {
        let store: EntryStore<String> = EntryStore::new();
        let dedup = FetchDeduplicator::new(store.clone());
        let err = dedup
            .request(&key("a"), || async { Err(CacheError::NotFound("a".into())) })
            .await
            .unwrap_err();
        assert_eq!(err, CacheError::NotFound("a".into()));
        let entry = store.get(&key("a")).unwrap();
        assert_eq!(entry.status(), FetchStatus::Error);
        assert_eq!(entry.last_error(), Some(&err));
    }

    #[tokio::test]
    async fn panicking_fetch_becomes_error() {
        let store: EntryStore<u32> = EntryStore::new();
        let dedup = FetchDeduplicator::new(store.clone());
        let err = dedup
            .request(&key("a"), || -> std::future::Ready<Result<u32>> {
                panic!("exploded before returning a future")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::FetchPanicked(ref m) if m.contains("exploded")));
        assert_eq!(store.get(&key("a")).unwrap().status(), FetchStatus::Error);
        assert!(!dedup.is_in_flight(&key("a")));
    }

    #[tokio::test]
    async fn bypassing_the_deduplicator_surfaces_already_pending() {
        let store: EntryStore<u32> = EntryStore::new();
        store.mark_pending(&key("a"), RequestId(999)).unwrap();
        let dedup = FetchDeduplicator::new(store.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let err = dedup
            .request(&key("a"), move || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::AlreadyPending { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(dedup.in_flight_count(), 0);
    }
}
