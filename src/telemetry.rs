//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus,
//! statsd); without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `dexcache_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `kind`: resource kind of the cache key (e.g. "pokemon", "type")
//! - `status`: fetch outcome: "ok" or "error"

/// Requests served from a fresh cache entry.
///
/// Labels: `kind`.
pub const CACHE_HITS_TOTAL: &str = "dexcache_cache_hits_total";

/// Requests that needed a fetch (absent, stale, errored or idle entry).
///
/// Labels: `kind`.
pub const CACHE_MISSES_TOTAL: &str = "dexcache_cache_misses_total";

/// Requests that joined a fetch already in flight for the same key.
///
/// Labels: `kind`.
pub const DEDUP_JOINS_TOTAL: &str = "dexcache_dedup_joins_total";

/// Completed fetches, counted once per in-flight request (not per attempt).
///
/// Labels: `kind`, `status` ("ok" | "error").
pub const FETCHES_TOTAL: &str = "dexcache_fetches_total";

/// Retry attempts (not counting the initial request).
///
/// Labels: `kind`.
pub const RETRIES_TOTAL: &str = "dexcache_retries_total";

/// Pages appended to a page sequence.
///
/// Labels: `kind`.
pub const PAGES_TOTAL: &str = "dexcache_pages_total";
