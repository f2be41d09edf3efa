//! Age-based staleness.
//!
//! An entry is fresh when its last fetch succeeded and no more than
//! `max_age` has elapsed since. Thresholds are configured per
//! [`ResourceKind`]: a slow-changing catalogue list can stay fresh far longer
//! than a search result.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use super::entry::{CacheEntry, FetchStatus};
use crate::key::ResourceKind;

/// Default staleness threshold: 5 minutes.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Whether `entry` may be served at `now` without a refetch.
///
/// The boundary is inclusive: an entry that succeeded at `T` is fresh at
/// `T + max_age` and stale one tick later. Entries in
/// [`FetchStatus::Error`] are never fresh, whatever their age.
pub fn is_fresh<V>(entry: &CacheEntry<V>, max_age: Duration, now: Instant) -> bool {
    if entry.status() != FetchStatus::Success {
        return false;
    }
    match entry.last_success_at() {
        Some(at) => now.saturating_duration_since(at) <= max_age,
        None => false,
    }
}

/// Per-kind staleness thresholds.
///
/// ```rust
/// # use dexcache::cache::FreshnessPolicy;
/// # use std::time::Duration;
/// let policy = FreshnessPolicy::new(Duration::from_secs(300))
///     .with_kind("type", Duration::from_secs(1800));
/// ```
#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    default_max_age: Duration,
    per_kind: HashMap<String, Duration>,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}

impl FreshnessPolicy {
    pub fn new(default_max_age: Duration) -> Self {
        Self {
            default_max_age,
            per_kind: HashMap::new(),
        }
    }

    /// Override the threshold for one resource kind.
    pub fn with_kind(mut self, kind: impl Into<String>, max_age: Duration) -> Self {
        self.per_kind.insert(kind.into(), max_age);
        self
    }

    pub fn set_kind(&mut self, kind: impl Into<String>, max_age: Duration) {
        self.per_kind.insert(kind.into(), max_age);
    }

    pub fn set_default_max_age(&mut self, max_age: Duration) {
        self.default_max_age = max_age;
    }

    pub fn default_max_age(&self) -> Duration {
        self.default_max_age
    }

    /// Threshold for `kind`, falling back to the default.
    pub fn max_age_for(&self, kind: &ResourceKind) -> Duration {
        self.per_kind
            .get(kind.as_str())
            .copied()
            .unwrap_or(self.default_max_age)
    }

    /// [`is_fresh`] using the threshold configured for `kind`.
    pub fn is_fresh<V>(&self, kind: &ResourceKind, entry: &CacheEntry<V>, now: Instant) -> bool {
        is_fresh(entry, self.max_age_for(kind), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheError;

    fn success_at(at: Instant) -> CacheEntry<&'static str> {
        CacheEntry {
            value: Some("bulbasaur-data"),
            status: FetchStatus::Success,
            last_success_at: Some(at),
            last_error: None,
            in_flight: None,
        }
    }

    #[test]
    fn boundary_is_inclusive() {
        let t = Instant::now();
        let max_age = Duration::from_millis(1000);
        let entry = success_at(t);
        assert!(is_fresh(&entry, max_age, t));
        assert!(is_fresh(&entry, max_age, t + max_age));
        assert!(!is_fresh(
            &entry,
            max_age,
            t + max_age + Duration::from_millis(1)
        ));
    }

    #[test]
    fn error_entries_are_never_fresh() {
        let t = Instant::now();
        let mut entry = success_at(t);
        entry.status = FetchStatus::Error;
        entry.last_error = Some(CacheError::Http("reset".into()));
        assert!(!is_fresh(&entry, Duration::from_secs(3600), t));
    }

    #[test]
    fn idle_and_pending_are_not_fresh() {
        let t = Instant::now();
        let mut entry = success_at(t);
        entry.status = FetchStatus::Idle;
        assert!(!is_fresh(&entry, Duration::from_secs(60), t));
        entry.status = FetchStatus::Pending;
        assert!(!is_fresh(&entry, Duration::from_secs(60), t));
    }

    #[test]
    fn per_kind_thresholds() {
        let policy = FreshnessPolicy::new(Duration::from_secs(300))
            .with_kind("type", Duration::from_secs(1800));
        let type_kind = ResourceKind::new("type").unwrap();
        let pokemon_kind = ResourceKind::new("pokemon").unwrap();
        assert_eq!(policy.max_age_for(&type_kind), Duration::from_secs(1800));
        assert_eq!(policy.max_age_for(&pokemon_kind), Duration::from_secs(300));

        let t = Instant::now();
        let entry = success_at(t);
        let later = t + Duration::from_secs(600);
        assert!(policy.is_fresh(&type_kind, &entry, later));
        assert!(!policy.is_fresh(&pokemon_kind, &entry, later));
    }
}
