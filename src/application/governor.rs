//! The governance façade.
//!
//! `Governor` is the only entry point the request-handling layer calls.
//! It owns the rate limiter, response cache, and session tracker for the
//! lifetime of the process; nothing outside it mutates them directly.

use crate::application::cache::{ComputeError, ResponseCache};
use crate::application::limiter::RateLimiter;
use crate::application::metrics::Metrics;
use crate::application::ports::Clock;
use crate::application::session::SessionTracker;
use crate::domain::identity::Identity;
use crate::domain::session::SessionInfo;
use crate::domain::window::{AdmissionDecision, LimitScope, RateLimits};
use crate::infrastructure::clock::SystemClock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::interval;

/// Error surfaced to the caller for a governed request.
///
/// The governor never retries internally and never suppresses a compute
/// error; it only adds rate and cache semantics around it. Mapping these to
/// wire responses (429 and so on) belongs to the calling layer.
#[derive(Debug, Clone, Error)]
pub enum GovernError {
    /// The rate limiter rejected the request.
    #[error("rate limit exceeded ({scope}): retry after {}s", .retry_after.as_secs())]
    RateLimited {
        /// Which window rejected it.
        scope: LimitScope,
        /// Time until a retry could be admitted.
        retry_after: Duration,
    },
    /// The external compute call failed, timed out, or was abandoned.
    #[error(transparent)]
    Compute(#[from] ComputeError),
}

/// Error returned when building a `Governor` fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// requests_per_minute must be greater than zero
    #[error("requests_per_minute must be greater than 0")]
    ZeroMinuteLimit,
    /// requests_per_hour must be greater than zero
    #[error("requests_per_hour must be greater than 0")]
    ZeroHourLimit,
    /// the minute limit cannot exceed the hour limit
    #[error("requests_per_minute cannot exceed requests_per_hour")]
    InvertedLimits,
    /// cache_ttl must be greater than zero
    #[error("cache_ttl must be greater than zero")]
    ZeroCacheTtl,
    /// session_idle_ttl must be greater than zero
    #[error("session_idle_ttl must be greater than zero")]
    ZeroSessionIdleTtl,
    /// compute_timeout must be greater than zero
    #[error("compute_timeout must be greater than zero")]
    ZeroComputeTimeout,
    /// sweep_interval must be greater than zero
    #[error("sweep_interval must be greater than zero")]
    ZeroSweepInterval,
}

/// A successfully served request: the report plus bookkeeping.
#[derive(Debug, Clone)]
pub struct Served<V> {
    /// The sector report.
    pub value: V,
    /// Whether the report came from a live cache entry.
    pub cache_hit: bool,
    /// The caller's session after this request was recorded.
    pub session: SessionInfo,
}

/// Entries reclaimed by one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Idle identity request logs dropped.
    pub request_logs: usize,
    /// Idled-out sessions dropped.
    pub sessions: usize,
    /// Expired cache entries dropped.
    pub cache_entries: usize,
}

impl SweepReport {
    /// Total entries reclaimed across all stores.
    pub fn total(&self) -> usize {
        self.request_logs + self.sessions + self.cache_entries
    }
}

/// Builder for constructing a [`Governor`].
#[derive(Debug, Clone)]
pub struct GovernorBuilder {
    limits: RateLimits,
    cache_ttl: Duration,
    session_idle_ttl: Duration,
    compute_timeout: Duration,
    sweep_interval: Duration,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for GovernorBuilder {
    fn default() -> Self {
        Self {
            limits: RateLimits::default(),
            cache_ttl: Duration::from_secs(1800),
            session_idle_ttl: Duration::from_secs(1800),
            compute_timeout: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(60),
            clock: None,
        }
    }
}

impl GovernorBuilder {
    /// Set the per-minute admission limit. Default: 10.
    pub fn with_requests_per_minute(mut self, limit: u32) -> Self {
        self.limits.per_minute = limit;
        self
    }

    /// Set the per-hour admission limit. Default: 100.
    pub fn with_requests_per_hour(mut self, limit: u32) -> Self {
        self.limits.per_hour = limit;
        self
    }

    /// Set how long computed reports stay cached. Default: 30 minutes.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set how long a session survives without activity. Default: 30 minutes.
    pub fn with_session_idle_ttl(mut self, ttl: Duration) -> Self {
        self.session_idle_ttl = ttl;
        self
    }

    /// Set the timeout applied to every compute call. Default: 120 seconds.
    pub fn with_compute_timeout(mut self, timeout: Duration) -> Self {
        self.compute_timeout = timeout;
        self
    }

    /// Set how often the background sweeper runs. Default: 60 seconds.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and build the governor.
    pub fn build<V>(self) -> Result<Governor<V>, BuildError>
    where
        V: Clone + Send + Sync + 'static,
    {
        if self.limits.per_minute == 0 {
            return Err(BuildError::ZeroMinuteLimit);
        }
        if self.limits.per_hour == 0 {
            return Err(BuildError::ZeroHourLimit);
        }
        if self.limits.per_minute > self.limits.per_hour {
            return Err(BuildError::InvertedLimits);
        }
        if self.cache_ttl.is_zero() {
            return Err(BuildError::ZeroCacheTtl);
        }
        if self.session_idle_ttl.is_zero() {
            return Err(BuildError::ZeroSessionIdleTtl);
        }
        if self.compute_timeout.is_zero() {
            return Err(BuildError::ZeroComputeTimeout);
        }
        if self.sweep_interval.is_zero() {
            return Err(BuildError::ZeroSweepInterval);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        Ok(Governor {
            limiter: RateLimiter::new(self.limits, clock.clone()),
            cache: ResponseCache::new(self.cache_ttl, self.compute_timeout, clock.clone()),
            sessions: SessionTracker::new(self.session_idle_ttl, clock),
            metrics: Metrics::new(),
            sweep_interval: self.sweep_interval,
        })
    }
}

/// The governance façade: rate limiting, caching, and session tracking for
/// sector-report requests.
#[derive(Debug)]
pub struct Governor<V>
where
    V: Clone + Send + Sync + 'static,
{
    limiter: RateLimiter,
    cache: ResponseCache<V>,
    sessions: SessionTracker,
    metrics: Metrics,
    sweep_interval: Duration,
}

impl<V> Governor<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Start building a governor.
    pub fn builder() -> GovernorBuilder {
        GovernorBuilder::default()
    }

    /// Create a governor with all defaults.
    pub fn with_defaults() -> Self {
        GovernorBuilder::default()
            .build()
            .expect("default configuration is valid")
    }

    /// Serve one governed request.
    ///
    /// Admission is checked first and is a precondition for every request,
    /// cache hit or not. Admitted requests refresh the caller's session,
    /// then consult the cache; on a cold key `compute` runs under the
    /// configured timeout with single-flight de-duplication. A failed
    /// compute never touches the cache and is reported to every caller
    /// waiting on the same key.
    pub async fn serve<F, Fut>(
        &self,
        identity: &str,
        sector: &str,
        compute: F,
    ) -> Result<Served<V>, GovernError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, anyhow::Error>>,
    {
        let identity = Identity::new(identity);
        match self.limiter.check(&identity) {
            AdmissionDecision::Rejected { scope, retry_after } => {
                self.metrics.record_rejected();
                return Err(GovernError::RateLimited { scope, retry_after });
            }
            AdmissionDecision::Admitted => self.metrics.record_admitted(),
        }

        let session = self.sessions.touch(&identity);

        match self.cache.get_or_compute(sector, compute).await {
            Ok(outcome) => {
                if outcome.hit {
                    self.metrics.record_cache_hit();
                } else {
                    self.metrics.record_cache_miss();
                }
                Ok(Served {
                    value: outcome.value,
                    cache_hit: outcome.hit,
                    session,
                })
            }
            Err(err) => {
                self.metrics.record_compute_failed();
                Err(GovernError::Compute(err))
            }
        }
    }

    /// Run just the admission check for an identity, recording the request
    /// if admitted.
    ///
    /// For callers that integrate admission separately from serving; a
    /// request passed to [`serve`](Self::serve) performs its own check and
    /// must not also go through this.
    pub fn allow_request(&self, identity: &str) -> AdmissionDecision {
        let decision = self.limiter.check(&Identity::new(identity));
        match decision {
            AdmissionDecision::Admitted => self.metrics.record_admitted(),
            AdmissionDecision::Rejected { .. } => self.metrics.record_rejected(),
        }
        decision
    }

    /// Record session activity for an identity without serving a request.
    pub fn touch_session(&self, identity: &str) -> SessionInfo {
        self.sessions.touch(&Identity::new(identity))
    }

    /// Whether the identity has a live session.
    pub fn session_active(&self, identity: &str) -> bool {
        self.sessions.is_active(&Identity::new(identity))
    }

    /// Drop the identity's session immediately.
    pub fn invalidate_session(&self, identity: &str) -> bool {
        self.sessions.invalidate(&Identity::new(identity))
    }

    /// Drop the cached report for a sector, forcing the next request to
    /// recompute.
    pub fn invalidate_cached(&self, sector: &str) -> bool {
        self.cache.invalidate(sector)
    }

    /// Drop every cached report.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// The governance metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Sweep all stores once, dropping expired entries.
    pub fn sweep_now(&self) -> SweepReport {
        let report = SweepReport {
            request_logs: self.limiter.sweep(),
            sessions: self.sessions.sweep(),
            cache_entries: self.cache.sweep(),
        };
        if report.total() > 0 {
            self.metrics.record_swept(report.total() as u64);
            tracing::debug!(
                request_logs = report.request_logs,
                sessions = report.sessions,
                cache_entries = report.cache_entries,
                "sweep reclaimed expired entries"
            );
        }
        report
    }

    /// Spawn a background task sweeping all stores at the configured
    /// interval.
    ///
    /// Best-effort memory bounding only: lazy expiry keeps results correct
    /// whether or not this task runs. Abort the returned handle to stop it.
    pub fn start_sweeper(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.sweep_interval);
            // The first tick fires immediately; skip it so the task only
            // sweeps after a full interval has passed.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep_now();
            }
        })
    }
}
