//! Cache entry state.

use std::fmt;

use tokio::time::Instant;

use crate::CacheError;

/// Identifier of one in-flight fetch, unique per deduplicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fetch lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

/// State recorded for a single cache key.
///
/// `value` survives a failed refetch: after `Success → Error` the previous
/// value and `last_success_at` are still here (stale-while-error).
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub(crate) value: Option<V>,
    pub(crate) status: FetchStatus,
    pub(crate) last_success_at: Option<Instant>,
    pub(crate) last_error: Option<CacheError>,
    pub(crate) in_flight: Option<RequestId>,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self {
            value: None,
            status: FetchStatus::Idle,
            last_success_at: None,
            last_error: None,
            in_flight: None,
        }
    }
}

impl<V> CacheEntry<V> {
    /// Last successfully fetched value, if any.
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<V> {
        self.value
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn last_success_at(&self) -> Option<Instant> {
        self.last_success_at
    }

    /// Error from the latest failed fetch. Only set while `status == Error`.
    pub fn last_error(&self) -> Option<&CacheError> {
        self.last_error.as_ref()
    }

    /// Request currently fetching this key. Only set while `status == Pending`.
    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.status == FetchStatus::Pending
    }
}
