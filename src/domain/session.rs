//! Session liveness state.

use std::time::{Duration, Instant};

/// Mutable state tracked for one live session.
///
/// A session exists purely for bookkeeping: when the caller first appeared,
/// when it was last seen, and how many requests it has been served. It never
/// gates admission; that is the rate limiter's job.
#[derive(Debug, Clone)]
pub struct SessionState {
    created_at: Instant,
    last_seen: Instant,
    request_count: u64,
}

impl SessionState {
    /// Start a fresh session.
    pub fn new(now: Instant) -> Self {
        Self {
            created_at: now,
            last_seen: now,
            request_count: 0,
        }
    }

    /// Record activity: refresh the last-seen time and bump the counter.
    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
        self.request_count += 1;
    }

    /// When this session was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When this session last saw a request.
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Requests served to this session so far.
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    /// Produce a read-only view of this session as of `now`.
    pub fn info(&self, now: Instant) -> SessionInfo {
        SessionInfo {
            age: now.saturating_duration_since(self.created_at),
            idle: now.saturating_duration_since(self.last_seen),
            request_count: self.request_count,
        }
    }
}

/// Point-in-time view of a session, reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    /// Time since the session was created.
    pub age: Duration,
    /// Time since the last recorded activity.
    pub idle: Duration,
    /// Requests served to this session so far.
    pub request_count: u64,
}
