//! # market-governor
//!
//! Request governance for a market-report service: per-client rate limiting,
//! time-bounded response caching with single-flight de-duplication, and
//! idle-session tracking, all in-process with no external state storage.
//!
//! The crate sits between an HTTP layer and an expensive external
//! computation (web search plus AI analysis per market sector). It decides,
//! per request, one of three things: serve from cache, compute and cache,
//! or reject with a retry hint - while guaranteeing that no client starves
//! others, that expired state does not accumulate, and that a cold cache
//! key is computed at most once no matter how many requests race for it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use market_governor::Governor;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! // Defaults: 10 requests/min, 100/hour, 30-minute cache and session ttl.
//! let governor = Governor::<String>::builder()
//!     .with_requests_per_minute(10)
//!     .build()?;
//!
//! let served = governor
//!     .serve("203.0.113.7", "Technology", || async {
//!         // The expensive upstream call lives here.
//!         Ok::<_, anyhow::Error>("…full market report…".to_string())
//!     })
//!     .await?;
//!
//! println!(
//!     "hit={} session_requests={}",
//!     served.cache_hit, served.session.request_count
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Admission
//!
//! Each identity (an IP address, an API-key hash - the crate does not care)
//! carries a sliding-window log of its admitted requests. A request is
//! rejected when the identity already has `requests_per_minute` entries in
//! the last minute or `requests_per_hour` in the last hour; the rejection
//! carries the window that tripped and how long until a retry could be
//! admitted. Admission is a precondition for every request, including ones
//! that would be cache hits: a rate-limited client cannot keep pulling
//! cached reports.
//!
//! ## Single-Flight Caching
//!
//! Sector names are normalized (trimmed, lower-cased) into one key space,
//! so `"Technology"` and `" technology "` share a cache entry. On a miss,
//! exactly one caller computes; concurrent callers for the same key wait on
//! the winner's in-flight marker and receive the same value - or the same
//! failure. Failures (including timeouts) are never cached and the marker
//! is always released, so one bad upstream call never wedges a key.
//!
//! ## Expiry
//!
//! All three stores (request logs, cache entries, sessions) expire entries
//! two ways: lazily on access, which guarantees correctness, and through a
//! periodic sweep ([`Governor::start_sweeper`]), which bounds memory. The
//! sweep is best-effort by design; nothing depends on it running promptly.
//!
//! ## Testing
//!
//! Everything time-dependent goes through an injectable [`Clock`], so
//! window expiry, cache ttl, and session idling can be driven
//! deterministically with `MockClock` (enable the `test-helpers` feature
//! in dev-dependencies).

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    identity::Identity,
    key::SectorKey,
    session::SessionInfo,
    window::{AdmissionDecision, LimitScope, RateLimits},
};

pub use application::{
    cache::{ComputeError, Outcome, ResponseCache},
    governor::{BuildError, GovernError, Governor, GovernorBuilder, Served, SweepReport},
    limiter::RateLimiter,
    metrics::{Metrics, MetricsSnapshot},
    ports::Clock,
    session::SessionTracker,
};

pub use infrastructure::{clock::SystemClock, store::ExpiringStore};

#[cfg(any(test, feature = "test-helpers"))]
pub use infrastructure::mocks::MockClock;
