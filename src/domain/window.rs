//! Sliding-window request logs and admission decisions.
//!
//! The limiter algorithm is a sliding-window log: every admitted request
//! leaves a timestamp, and an admission check counts how many timestamps
//! fall inside each tracked window. Two windows are tracked per identity,
//! one minute and one hour.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Which limit a rejection was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    /// The per-minute limit was exhausted.
    PerMinute,
    /// The per-hour limit was exhausted.
    PerHour,
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitScope::PerMinute => f.write_str("per_minute"),
            LimitScope::PerHour => f.write_str("per_hour"),
        }
    }
}

/// Configured request limits for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    /// Maximum admitted requests within any sliding minute.
    pub per_minute: u32,
    /// Maximum admitted requests within any sliding hour.
    pub per_hour: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_minute: 10,
            per_hour: 100,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// The request was admitted and recorded.
    Admitted,
    /// The request was rejected; nothing was recorded.
    Rejected {
        /// Which window rejected it.
        scope: LimitScope,
        /// Time until the oldest in-window entry falls out and a retry
        /// could be admitted.
        retry_after: Duration,
    },
}

impl AdmissionDecision {
    /// Whether the request was admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionDecision::Admitted)
    }
}

/// Per-identity log of admitted request timestamps.
///
/// Invariant: after [`admit`](Self::admit) returns, every stored timestamp
/// is at most [`RequestWindow::RETENTION`] old. Rejected requests are never
/// recorded, so a rejected client cannot push its own window further out.
#[derive(Debug, Clone, Default)]
pub struct RequestWindow {
    log: VecDeque<Instant>,
}

impl RequestWindow {
    /// The longest tracked window; entries older than this are pruned.
    pub const RETENTION: Duration = Duration::from_secs(3600);

    const MINUTE: Duration = Duration::from_secs(60);

    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check this request against both windows, recording it if admitted.
    pub fn admit(&mut self, now: Instant, limits: &RateLimits) -> AdmissionDecision {
        self.prune(now);

        let in_minute = self
            .log
            .iter()
            .rev()
            .take_while(|&&t| now.saturating_duration_since(t) < Self::MINUTE)
            .count();
        if in_minute >= limits.per_minute as usize {
            return AdmissionDecision::Rejected {
                scope: LimitScope::PerMinute,
                retry_after: self.retry_after(now, Self::MINUTE),
            };
        }

        // The log is already pruned to the hour, so its length is the
        // hourly count.
        if self.log.len() >= limits.per_hour as usize {
            return AdmissionDecision::Rejected {
                scope: LimitScope::PerHour,
                retry_after: self.retry_after(now, Self::RETENTION),
            };
        }

        self.log.push_back(now);
        AdmissionDecision::Admitted
    }

    /// Number of timestamps currently held.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether the log holds no timestamps.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.log.front() {
            if now.saturating_duration_since(oldest) >= Self::RETENTION {
                self.log.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until the oldest entry inside `window` ages out of it.
    fn retry_after(&self, now: Instant, window: Duration) -> Duration {
        self.log
            .iter()
            .find(|&&t| now.saturating_duration_since(t) < window)
            .map(|&oldest| window - now.saturating_duration_since(oldest))
            .unwrap_or(window)
    }
}
