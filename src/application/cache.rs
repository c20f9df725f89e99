//! Response cache with single-flight de-duplication.
//!
//! Sector reports are expensive to compute (upstream search plus AI
//! analysis, both slow and rate-limited themselves), so the cache does two
//! jobs: memoize results for a ttl, and make sure a cold key is computed by
//! exactly one caller while everyone else waits on that computation.

use crate::application::ports::Clock;
use crate::domain::key::SectorKey;
use crate::infrastructure::store::ExpiringStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Failure of the external compute call, delivered to every waiter joined
/// on the same flight.
///
/// The variants are cloneable on purpose: one failure is fanned out to N
/// concurrent callers. Failures are never cached; the next caller after a
/// failed flight starts a fresh compute.
#[derive(Debug, Clone, Error)]
pub enum ComputeError {
    /// The compute function returned an error.
    #[error("compute failed: {0}")]
    Failed(Arc<anyhow::Error>),
    /// The compute function exceeded the configured timeout.
    #[error("compute timed out after {0:?}")]
    TimedOut(Duration),
    /// The caller driving the compute was cancelled before it resolved.
    #[error("compute was abandoned before resolving")]
    Abandoned,
}

/// Result of a cache consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<V> {
    /// True when the value came from a live cache entry; false when this
    /// call (or a flight it joined) computed it.
    pub hit: bool,
    /// The sector report.
    pub value: V,
}

/// Resolution state published through a flight's watch channel.
#[derive(Debug, Clone)]
enum FlightState<V> {
    Pending,
    Resolved(Result<V, ComputeError>),
}

/// Removes the in-flight marker when the winning caller finishes or is
/// dropped mid-compute. Removal must be unconditional: a marker that
/// outlives its flight would starve the key forever.
struct FlightGuard<'a, V> {
    inflight: &'a DashMap<SectorKey, watch::Receiver<FlightState<V>>>,
    key: &'a SectorKey,
}

impl<V> Drop for FlightGuard<'_, V> {
    fn drop(&mut self) {
        self.inflight.remove(self.key);
    }
}

/// ttl cache over sector reports with at-most-one compute per key.
#[derive(Debug)]
pub struct ResponseCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    entries: ExpiringStore<SectorKey, V>,
    inflight: DashMap<SectorKey, watch::Receiver<FlightState<V>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    compute_timeout: Duration,
}

impl<V> ResponseCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with the given entry ttl and compute timeout.
    pub fn new(ttl: Duration, compute_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: ExpiringStore::new(),
            inflight: DashMap::new(),
            clock,
            ttl,
            compute_timeout,
        }
    }

    /// Return the cached report for `sector`, computing it if absent.
    ///
    /// The raw sector name is normalized first, so `"Technology"` and
    /// `" technology "` share one entry and one flight. On a miss, the
    /// first caller installs an in-flight marker and runs `compute` under
    /// the configured timeout; every concurrent caller for the same key
    /// joins that marker and receives the same resolved value or the same
    /// failure. No lock is held across the compute await - the marker, not
    /// a lock, is what waiters wait on.
    pub async fn get_or_compute<F, Fut>(
        &self,
        sector: &str,
        compute: F,
    ) -> Result<Outcome<V>, ComputeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, anyhow::Error>>,
    {
        let key = SectorKey::new(sector);

        if let Some(value) = self.entries.get(&key, self.clock.now()) {
            tracing::debug!(sector = %key, "serving cached report");
            return Ok(Outcome { hit: true, value });
        }

        // Install the marker or join an existing one. The entry lock is
        // released before anything awaits.
        let sender = match self.inflight.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                let rx = occupied.get().clone();
                drop(occupied);
                return self.join_flight(rx).await;
            }
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(FlightState::Pending);
                vacant.insert(rx);
                tx
            }
        };

        // This caller won the marker and drives the compute. The guard
        // removes the marker no matter how this future ends, including
        // cancellation; dropping `sender` with it wakes every waiter.
        let guard = FlightGuard {
            inflight: &self.inflight,
            key: &key,
        };

        let result = match tokio::time::timeout(self.compute_timeout, compute()).await {
            Ok(Ok(value)) => {
                self.entries
                    .insert(key.clone(), value.clone(), self.ttl, self.clock.now());
                Ok(value)
            }
            Ok(Err(cause)) => Err(ComputeError::Failed(Arc::new(cause))),
            Err(_) => Err(ComputeError::TimedOut(self.compute_timeout)),
        };

        // A successful result is already cached, so late arrivals between
        // the marker removal and the publish land on the cache entry.
        drop(guard);
        let _ = sender.send(FlightState::Resolved(result.clone()));

        if let Err(err) = &result {
            tracing::warn!(sector = %key, error = %err, "sector compute failed");
        }
        result.map(|value| Outcome { hit: false, value })
    }

    /// Wait on another caller's flight for the same key.
    async fn join_flight(
        &self,
        mut rx: watch::Receiver<FlightState<V>>,
    ) -> Result<Outcome<V>, ComputeError> {
        loop {
            {
                let state = rx.borrow_and_update();
                if let FlightState::Resolved(result) = &*state {
                    return result.clone().map(|value| Outcome { hit: false, value });
                }
            }
            if rx.changed().await.is_err() {
                // The winner was dropped. It may still have published just
                // before; check once more, otherwise report abandonment.
                let state = rx.borrow();
                if let FlightState::Resolved(result) = &*state {
                    return result.clone().map(|value| Outcome { hit: false, value });
                }
                return Err(ComputeError::Abandoned);
            }
        }
    }

    /// Drop the cached entry for a sector, if any. Returns true when an
    /// entry was removed.
    pub fn invalidate(&self, sector: &str) -> bool {
        self.entries.remove(&SectorKey::new(sector)).is_some()
    }

    /// Drop every cached entry. In-flight computes are unaffected.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Whether a live entry exists for a sector right now.
    pub fn contains(&self, sector: &str) -> bool {
        self.entries
            .contains_live(&SectorKey::new(sector), self.clock.now())
    }

    /// Number of entries held, including expired-but-unswept ones.
    pub fn tracked_entries(&self) -> usize {
        self.entries.len()
    }

    /// Drop expired entries. Returns how many were reclaimed.
    pub fn sweep(&self) -> usize {
        self.entries.sweep(self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn cache(ttl_secs: u64) -> (ResponseCache<String>, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let cache = ResponseCache::new(
            Duration::from_secs(ttl_secs),
            Duration::from_secs(5),
            clock.clone(),
        );
        (cache, clock)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, _clock) = cache(1800);

        let first = cache
            .get_or_compute("technology", || async { Ok("report".to_string()) })
            .await
            .unwrap();
        assert!(!first.hit);
        assert_eq!(first.value, "report");

        let second = cache
            .get_or_compute("technology", || async {
                panic!("cached key must not recompute")
            })
            .await
            .unwrap();
        assert!(second.hit);
        assert_eq!(second.value, "report");
    }

    #[tokio::test]
    async fn test_raw_spellings_share_one_entry() {
        let (cache, _clock) = cache(1800);

        cache
            .get_or_compute("Technology", || async { Ok("report".to_string()) })
            .await
            .unwrap();

        let outcome = cache
            .get_or_compute("  TECHNOLOGY ", || async {
                panic!("normalized key must hit the cache")
            })
            .await
            .unwrap();
        assert!(outcome.hit);
    }

    #[tokio::test]
    async fn test_entry_expires_at_ttl() {
        let (cache, clock) = cache(1800);
        let calls = AtomicUsize::new(0);

        cache
            .get_or_compute("technology", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("v1".to_string())
            })
            .await
            .unwrap();

        clock.advance(Duration::from_secs(1799));
        let near_expiry = cache
            .get_or_compute("technology", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("v2".to_string())
            })
            .await
            .unwrap();
        assert!(near_expiry.hit);
        assert_eq!(near_expiry.value, "v1");

        clock.advance(Duration::from_secs(2));
        let past_expiry = cache
            .get_or_compute("technology", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("v2".to_string())
            })
            .await
            .unwrap();
        assert!(!past_expiry.hit);
        assert_eq!(past_expiry.value, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let (cache, _clock) = cache(1800);

        let err = cache
            .get_or_compute("energy", || async {
                Err::<String, _>(anyhow::anyhow!("upstream unavailable"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::Failed(_)));
        assert!(!cache.contains("energy"));

        // The next caller retries and succeeds.
        let outcome = cache
            .get_or_compute("energy", || async { Ok("recovered".to_string()) })
            .await
            .unwrap();
        assert!(!outcome.hit);
        assert_eq!(outcome.value, "recovered");
    }

    #[tokio::test]
    async fn test_timeout_releases_marker() {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let cache = ResponseCache::<String>::new(
            Duration::from_secs(1800),
            Duration::from_millis(20),
            clock,
        );

        let err = cache
            .get_or_compute("energy", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("never".to_string())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::TimedOut(_)));

        // The marker is gone; a fresh compute runs immediately.
        let outcome = cache
            .get_or_compute("energy", || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(outcome.value, "fresh");
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let (cache, _clock) = cache(1800);

        cache
            .get_or_compute("technology", || async { Ok("report".to_string()) })
            .await
            .unwrap();
        assert!(cache.contains("technology"));

        assert!(cache.invalidate("Technology"));
        assert!(!cache.contains("technology"));
        assert!(!cache.invalidate("technology"));

        cache
            .get_or_compute("energy", || async { Ok("report".to_string()) })
            .await
            .unwrap();
        cache.clear();
        assert_eq!(cache.tracked_entries(), 0);
    }

    #[tokio::test]
    async fn test_sweep_reclaims_expired_entries() {
        let (cache, clock) = cache(60);

        cache
            .get_or_compute("technology", || async { Ok("report".to_string()) })
            .await
            .unwrap();
        assert_eq!(cache.tracked_entries(), 1);

        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.tracked_entries(), 0);
    }
}
