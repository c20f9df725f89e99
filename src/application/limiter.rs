//! Per-identity rate limiting over sliding windows.

use crate::application::ports::Clock;
use crate::domain::identity::Identity;
use crate::domain::window::{AdmissionDecision, RateLimits, RequestWindow};
use crate::infrastructure::store::ExpiringStore;
use std::sync::Arc;

/// Admits or rejects requests per identity using a sliding-window log.
///
/// Each identity owns a [`RequestWindow`] kept in an [`ExpiringStore`] with
/// a ttl of one hour from last activity, so identities that go quiet are
/// reclaimed rather than accumulating forever. The admission check for one
/// identity runs under that identity's entry lock, which applies decisions
/// in arrival order.
#[derive(Debug)]
pub struct RateLimiter {
    windows: ExpiringStore<Identity, RequestWindow>,
    limits: RateLimits,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter with the given limits and clock.
    pub fn new(limits: RateLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: ExpiringStore::new(),
            limits,
            clock,
        }
    }

    /// Check one request against both windows, recording it if admitted.
    pub fn check(&self, identity: &Identity) -> AdmissionDecision {
        let now = self.clock.now();
        let limits = self.limits;
        let decision = self.windows.with_entry_mut(
            identity.clone(),
            RequestWindow::RETENTION,
            now,
            RequestWindow::new,
            |window| window.admit(now, &limits),
        );
        if let AdmissionDecision::Rejected { scope, retry_after } = &decision {
            tracing::debug!(
                identity = %identity,
                %scope,
                retry_after_secs = retry_after.as_secs(),
                "request rejected by rate limiter"
            );
        }
        decision
    }

    /// The configured limits.
    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    /// Number of identities currently tracked (including idle ones not yet
    /// swept).
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    /// Drop request logs for identities idle longer than the retention
    /// window. Returns how many were reclaimed.
    pub fn sweep(&self) -> usize {
        self.windows.sweep(self.clock.now())
    }

    /// Forget all request logs.
    pub fn clear(&self) {
        self.windows.clear();
    }
}
