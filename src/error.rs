//! dexcache error types

use crate::cache::RequestId;

/// dexcache error types.
///
/// `Clone` so that a single fetch outcome can be handed to every caller
/// that joined the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    // Key construction
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// A second request id tried to mark a key that already has a fetch in
    /// flight. Only reachable when a caller bypasses the deduplicator.
    #[error("key {key} already has request {in_flight} in flight (attempted {requested})")]
    AlreadyPending {
        key: String,
        in_flight: RequestId,
        requested: RequestId,
    },

    // Fetch errors
    #[error("transient fetch error: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("fetch panicked: {0}")]
    FetchPanicked(String),

    #[error("fetch task was cancelled before completing")]
    Cancelled,

    // Configuration / storage
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl CacheError {
    /// Whether this error is worth retrying.
    ///
    /// Network failures, 5xx responses, rate limiting and explicit
    /// [`Transient`](Self::Transient) errors are transient. A definitive
    /// [`NotFound`](Self::NotFound) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether the upstream definitively reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CacheError::Json(err.to_string())
        } else {
            CacheError::Http(err.to_string())
        }
    }
}

/// Result type alias for dexcache operations
pub type Result<T> = std::result::Result<T, CacheError>;
