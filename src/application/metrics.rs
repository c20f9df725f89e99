//! Observability metrics for the governance layer.
//!
//! Counters about admission, cache effectiveness, and compute failures for
//! monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking governance statistics.
///
/// All counters use atomic operations for thread-safe updates and reads,
/// and can be queried at any time.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Requests admitted by the rate limiter
    requests_admitted: AtomicU64,
    /// Requests rejected by the rate limiter
    requests_rejected: AtomicU64,
    /// Requests served from a live cache entry
    cache_hits: AtomicU64,
    /// Requests that computed (or joined a flight computing) a fresh report
    cache_misses: AtomicU64,
    /// Compute calls that failed or timed out
    computes_failed: AtomicU64,
    /// Entries reclaimed by periodic sweeps across all stores
    entries_swept: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                requests_admitted: AtomicU64::new(0),
                requests_rejected: AtomicU64::new(0),
                cache_hits: AtomicU64::new(0),
                cache_misses: AtomicU64::new(0),
                computes_failed: AtomicU64::new(0),
                entries_swept: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.requests_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compute_failed(&self) {
        self.inner.computes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: u64) {
        self.inner.entries_swept.fetch_add(count, Ordering::Relaxed);
    }

    /// Requests admitted by the rate limiter.
    pub fn requests_admitted(&self) -> u64 {
        self.inner.requests_admitted.load(Ordering::Relaxed)
    }

    /// Requests rejected by the rate limiter.
    pub fn requests_rejected(&self) -> u64 {
        self.inner.requests_rejected.load(Ordering::Relaxed)
    }

    /// Requests served from a live cache entry.
    pub fn cache_hits(&self) -> u64 {
        self.inner.cache_hits.load(Ordering::Relaxed)
    }

    /// Requests that computed (or joined a flight computing) a fresh report.
    pub fn cache_misses(&self) -> u64 {
        self.inner.cache_misses.load(Ordering::Relaxed)
    }

    /// Compute calls that failed or timed out.
    pub fn computes_failed(&self) -> u64 {
        self.inner.computes_failed.load(Ordering::Relaxed)
    }

    /// Entries reclaimed by periodic sweeps.
    pub fn entries_swept(&self) -> u64 {
        self.inner.entries_swept.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_admitted: self.requests_admitted(),
            requests_rejected: self.requests_rejected(),
            cache_hits: self.cache_hits(),
            cache_misses: self.cache_misses(),
            computes_failed: self.computes_failed(),
            entries_swept: self.entries_swept(),
        }
    }

    /// Reset all counters to zero.
    ///
    /// Useful for testing or when starting a new monitoring period.
    pub fn reset(&self) {
        self.inner.requests_admitted.store(0, Ordering::Relaxed);
        self.inner.requests_rejected.store(0, Ordering::Relaxed);
        self.inner.cache_hits.store(0, Ordering::Relaxed);
        self.inner.cache_misses.store(0, Ordering::Relaxed);
        self.inner.computes_failed.store(0, Ordering::Relaxed);
        self.inner.entries_swept.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests admitted by the rate limiter
    pub requests_admitted: u64,
    /// Requests rejected by the rate limiter
    pub requests_rejected: u64,
    /// Requests served from a live cache entry
    pub cache_hits: u64,
    /// Requests that computed (or joined a flight computing) a fresh report
    pub cache_misses: u64,
    /// Compute calls that failed or timed out
    pub computes_failed: u64,
    /// Entries reclaimed by periodic sweeps
    pub entries_swept: u64,
}

impl MetricsSnapshot {
    /// Total requests that reached the façade (admitted + rejected).
    pub fn total_requests(&self) -> u64 {
        self.requests_admitted
            .saturating_add(self.requests_rejected)
    }

    /// Ratio of rejected requests to total requests (0.0 to 1.0).
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.requests_rejected as f64 / total as f64
        }
    }

    /// Ratio of cache hits to cache consults (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let consults = self.cache_hits.saturating_add(self.cache_misses);
        if consults == 0 {
            0.0
        } else {
            self.cache_hits as f64 / consults as f64
        }
    }
}
