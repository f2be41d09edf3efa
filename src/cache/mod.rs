//! Resource cache: entry store, deduplicated fetches, staleness and
//! change notification behind one handle.
//!
//! [`ResourceCache`] is the surface collaborators use:
//!
//! - [`request`](ResourceCache::request) serves a fresh entry without
//!   fetching; otherwise it runs the fetch through the retry policy and the
//!   [`FetchDeduplicator`], so concurrent requests for one key share a
//!   single upstream call.
//! - [`subscribe`](ResourceCache::subscribe) observes an entry's changes.
//! - [`invalidate`](ResourceCache::invalidate) forces the next request to
//!   refetch while keeping the old value readable.
//!
//! Paginated collections are layered on top in
//! [`pagination`](crate::pagination).
//!
//! A cache is an ordinary value: construct one per application (or per
//! test) and pass clones to whoever needs it.

pub mod dedup;
pub mod entry;
pub mod freshness;
pub mod notify;
pub mod store;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

pub use dedup::FetchDeduplicator;
pub use entry::{CacheEntry, FetchStatus, RequestId};
pub use freshness::{DEFAULT_MAX_AGE, FreshnessPolicy, is_fresh};
pub use notify::{Notifier, Subscription};
pub use store::EntryStore;

use crate::key::CacheKey;
use crate::retry::{RetryConfig, with_retry};
use crate::{Result, telemetry};

/// Default number of items per page for paginated resources.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache-wide configuration.
///
/// ```rust
/// # use dexcache::CacheOptions;
/// # use std::time::Duration;
/// let options = CacheOptions::new()
///     .max_age(Duration::from_secs(300))
///     .kind_max_age("type", Duration::from_secs(1800))
///     .max_attempts(2)
///     .page_size(24);
/// ```
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Staleness thresholds, per resource kind.
    pub freshness: FreshnessPolicy,
    /// Retry policy applied to every fetch.
    pub retry: RetryConfig,
    /// Items per page for page sequences. Default: 20.
    pub page_size: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            freshness: FreshnessPolicy::default(),
            retry: RetryConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default staleness threshold for kinds without an override.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.freshness.set_default_max_age(max_age);
        self
    }

    /// Staleness threshold for one resource kind.
    pub fn kind_max_age(mut self, kind: impl Into<String>, max_age: Duration) -> Self {
        self.freshness.set_kind(kind, max_age);
        self
    }

    /// Retries after the first attempt.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.retry.max_attempts = n;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn page_size(mut self, n: usize) -> Self {
        self.page_size = n.max(1);
        self
    }
}

/// Per-call overrides for [`ResourceCache::request_with`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Staleness threshold for this call only.
    pub max_age: Option<Duration>,
    /// Retry policy for this call only.
    pub retry: Option<RetryConfig>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Deduplicating, staleness-aware cache for values of type `V`.
///
/// Cloning yields another handle to the same entries.
pub struct ResourceCache<V> {
    store: EntryStore<V>,
    dedup: FetchDeduplicator<V>,
    options: Arc<CacheOptions>,
}

impl<V> Clone for ResourceCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            dedup: self.dedup.clone(),
            options: Arc::clone(&self.options),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for ResourceCache<V> {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

impl<V: Clone + Send + Sync + 'static> ResourceCache<V> {
    pub fn new(options: CacheOptions) -> Self {
        let store = EntryStore::new();
        Self {
            dedup: FetchDeduplicator::new(store.clone()),
            store,
            options: Arc::new(options),
        }
    }

    /// Return the value for `key`, fetching it with `fetch` unless the cached
    /// entry is fresh.
    ///
    /// `fetch` may be called more than once when retries are configured.
    /// Errors are recorded on the entry and returned; any previously cached
    /// value stays readable through [`get`](Self::get).
    pub async fn request<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        self.request_with(key, &RequestOptions::default(), fetch)
            .await
    }

    /// [`request`](Self::request) with per-call overrides.
    pub async fn request_with<F, Fut>(
        &self,
        key: &CacheKey,
        options: &RequestOptions,
        fetch: F,
    ) -> Result<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let max_age = options
            .max_age
            .unwrap_or_else(|| self.options.freshness.max_age_for(key.kind()));

        if let Some(entry) = self.store.get(key)
            && is_fresh(&entry, max_age, Instant::now())
            && let Some(value) = entry.into_value()
        {
            debug!(key = %key, "cache hit");
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "kind" => key.kind().to_string())
                .increment(1);
            return Ok(value);
        }

        debug!(key = %key, "cache miss");
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "kind" => key.kind().to_string())
            .increment(1);

        let retry = options
            .retry
            .clone()
            .unwrap_or_else(|| self.options.retry.clone());
        let kind = key.kind().to_string();
        self.dedup
            .request(key, move || async move { with_retry(&retry, &kind, fetch).await })
            .await
    }

    /// Current entry for `key`, including stale or errored state.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.store.get(key)
    }

    /// Cached value for `key` regardless of freshness.
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        self.store.get(key).and_then(CacheEntry::into_value)
    }

    /// Whether `key` would be served without a fetch right now.
    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        self.store.get(key).is_some_and(|entry| {
            self.options
                .freshness
                .is_fresh(key.kind(), &entry, Instant::now())
        })
    }

    /// Seed `key` with a value as if it had just been fetched.
    pub fn put(&self, key: &CacheKey, value: V) {
        self.store.put(key, value);
    }

    /// Force the next request for `key` to refetch. See [`EntryStore::invalidate`].
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.store.invalidate(key)
    }

    /// Remove the entry for `key` entirely.
    pub fn evict(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.store.evict(key)
    }

    /// Observe changes to `key`. See [`Notifier::subscribe`].
    pub fn subscribe<F>(&self, key: CacheKey, callback: F) -> Subscription
    where
        F: Fn(&CacheKey, &CacheEntry<V>) + Send + Sync + 'static,
    {
        self.store.subscribe(key, callback)
    }

    pub fn store(&self) -> &EntryStore<V> {
        &self.store
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Number of keys with a fetch in flight.
    pub fn in_flight_count(&self) -> usize {
        self.dedup.in_flight_count()
    }
}
