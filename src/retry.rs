//! Retry configuration and the shared retry helper.
//!
//! [`with_retry`] re-runs a fetch on transient failures (network errors,
//! 5xx, rate limiting) with jittered exponential backoff. Definitive
//! failures such as [`CacheError::NotFound`] are returned immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::telemetry;
use crate::{CacheError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// `max_attempts` counts the attempts made *after* the first one, so the
/// default of 2 allows three calls in total.
///
/// ```rust
/// # use dexcache::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(4)
///     .initial_delay(Duration::from_millis(100))
///     .jitter(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Additional attempts after the initial request. 0 = no retry. Default: 2.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 250ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 10s.
    pub max_delay: Duration,
    /// Whether to randomise each delay within `[delay/2, delay]`. Default: true.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Set the number of retries after the initial attempt.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Total number of calls this config allows, including the first.
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    /// Calculate the delay for a given retry number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * 2^retry`, capped at `max_delay`.
    /// Does NOT include jitter; see [`effective_delay()`](Self::effective_delay).
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(retry));
        delay.min(self.max_delay)
    }

    /// Backoff delay with jitter applied when enabled.
    pub fn effective_delay(&self, retry: u32) -> Duration {
        let delay = self.delay_for_attempt(retry);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let half = delay / 2;
        let spread = delay.saturating_sub(half).as_millis() as u64;
        half + Duration::from_millis(rand::rng().random_range(0..=spread))
    }
}

/// Execute an async fetch with retry logic.
///
/// Retries on transient errors (as classified by
/// [`CacheError::is_transient()`]) up to `config.max_attempts` times after
/// the first call. Permanent errors are returned immediately without retry.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, kind: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = config.total_attempts();
    let mut last_err = None;
    for attempt in 0..total {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < total {
                    metrics::counter!(telemetry::RETRIES_TOTAL, "kind" => kind.to_owned())
                        .increment(1);
                    let delay = config.effective_delay(attempt);
                    warn!(
                        kind,
                        attempt = attempt + 1,
                        max_attempts = total,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
    Err(last_err.unwrap_or_else(|| CacheError::Transient("no attempts were made".into())))
}
