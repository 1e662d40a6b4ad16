//! Metrics hooks for cache operations.
//!
//! Keys passed to the hooks are stored keys (`"{prefix}:{key}"`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Receives cache outcome events. All methods default to no-ops.
pub trait CacheMetrics: Send + Sync {
    /// A `get` was served from the store.
    fn record_hit(&self, _key: &str, _duration: Duration) {}

    /// A `get` fell through to the loader.
    fn record_miss(&self, _key: &str, _duration: Duration) {}

    /// An operation failed with an error returned to the caller.
    fn record_error(&self, _key: &str, _error: &str) {}

    /// A miss-fill write-back failed with a connectivity error and was
    /// swallowed.
    fn record_suppressed_write(&self, _key: &str, _error: &str) {}
}

/// Default metrics sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {}

/// Lock-free counters for each event kind.
///
/// # Example
///
/// ```
/// use readthrough_cache::observability::{CacheMetrics, CounterMetrics};
/// use std::time::Duration;
///
/// let metrics = CounterMetrics::default();
/// metrics.record_hit("user:1", Duration::from_millis(1));
/// assert_eq!(metrics.snapshot().hits, 1);
/// ```
#[derive(Debug, Default)]
pub struct CounterMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    suppressed_writes: AtomicU64,
}

/// Point-in-time copy of [`CounterMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub suppressed_writes: u64,
}

impl CounterMetrics {
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            suppressed_writes: self.suppressed_writes.load(Ordering::Relaxed),
        }
    }
}

impl CacheMetrics for CounterMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self, _key: &str, _duration: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self, _key: &str, _error: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_suppressed_write(&self, _key: &str, _error: &str) {
        self.suppressed_writes.fetch_add(1, Ordering::Relaxed);
    }
}

impl<M: CacheMetrics + ?Sized> CacheMetrics for std::sync::Arc<M> {
    fn record_hit(&self, key: &str, duration: Duration) {
        (**self).record_hit(key, duration)
    }

    fn record_miss(&self, key: &str, duration: Duration) {
        (**self).record_miss(key, duration)
    }

    fn record_error(&self, key: &str, error: &str) {
        (**self).record_error(key, error)
    }

    fn record_suppressed_write(&self, key: &str, error: &str) {
        (**self).record_suppressed_write(key, error)
    }
}
