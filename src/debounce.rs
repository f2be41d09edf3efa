//! Timer-based call coalescing.
//!
//! Each [`Debouncer::call`] cancels the pending timer (if any) and arms a new
//! one; the callback runs with the most recent argument once `delay` has
//! passed without another call. Typical use is search-as-you-type: only the
//! query typed last reaches the cache.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cache::lock;

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Delays a callback until calls stop arriving for `delay`.
///
/// Dropping the debouncer cancels any pending invocation.
///
/// # Panics
///
/// [`call`](Self::call) requires a tokio runtime context.
pub struct Debouncer<T> {
    delay: Duration,
    callback: Callback<T>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            delay,
            callback: Arc::new(callback),
            pending: Mutex::new(None),
        }
    }

    /// Re-arm the timer with `arg`, replacing any pending invocation.
    pub fn call(&self, arg: T) {
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback(arg);
        });

        if let Some(previous) = lock(&self.pending).replace(handle) {
            previous.abort();
        }
    }

    /// Disarm the timer without invoking the callback.
    pub fn cancel(&self) {
        if let Some(previous) = lock(&self.pending).take() {
            previous.abort();
        }
    }

    /// Whether an invocation is armed and has not run yet.
    pub fn is_pending(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(previous) = lock(&self.pending).take() {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(String) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        (seen, move |q: String| s.lock().unwrap().push(q))
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_call_in_window_fires() {
        let (seen, cb) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(300), cb);

        debouncer.call("p".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.call("pi".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.call("pik".to_string());
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(301)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["pik".to_string()]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn calls_outside_window_each_fire() {
        let (seen, cb) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(50), cb);

        debouncer.call("a".to_string());
        tokio::time::sleep(Duration::from_millis(60)).await;
        debouncer.call("b".to_string());
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_suppress_callback() {
        let (seen, cb) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(50), cb);
        debouncer.call("a".to_string());
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(seen.lock().unwrap().is_empty());

        debouncer.call("b".to_string());
        drop(debouncer);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(seen.lock().unwrap().is_empty());
    }
}
