//! Idle-expiring session tracking.

use crate::application::ports::Clock;
use crate::domain::identity::Identity;
use crate::domain::session::{SessionInfo, SessionState};
use crate::infrastructure::store::ExpiringStore;
use std::sync::Arc;
use std::time::Duration;

/// Records which identities are actively using the service.
///
/// Sessions expire from last activity: every [`touch`](Self::touch) pushes
/// the idle deadline out by the configured ttl, and a session that goes
/// quiet for that long stops being active. This is housekeeping and
/// observability only - the tracker never restricts admission.
#[derive(Debug)]
pub struct SessionTracker {
    sessions: ExpiringStore<Identity, SessionState>,
    idle_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionTracker {
    /// Create a tracker with the given idle ttl.
    pub fn new(idle_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: ExpiringStore::new(),
            idle_ttl,
            clock,
        }
    }

    /// Record activity for an identity, creating a session if it has none
    /// (or its previous one idled out). Returns the refreshed session view.
    pub fn touch(&self, identity: &Identity) -> SessionInfo {
        let now = self.clock.now();
        self.sessions.with_entry_mut(
            identity.clone(),
            self.idle_ttl,
            now,
            || SessionState::new(now),
            |session| {
                session.touch(now);
                session.info(now)
            },
        )
    }

    /// Whether the identity has a live session. Does not refresh the idle
    /// timer.
    pub fn is_active(&self, identity: &Identity) -> bool {
        self.sessions.contains_live(identity, self.clock.now())
    }

    /// Read-only view of a live session, if any. Does not refresh the idle
    /// timer.
    pub fn snapshot(&self, identity: &Identity) -> Option<SessionInfo> {
        let now = self.clock.now();
        self.sessions
            .get(identity, now)
            .map(|session| session.info(now))
    }

    /// Drop the identity's session immediately. Returns true when a session
    /// existed.
    pub fn invalidate(&self, identity: &Identity) -> bool {
        self.sessions.remove(identity).is_some()
    }

    /// Number of sessions held, including idled-out ones not yet swept.
    pub fn tracked_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Drop idled-out sessions. Returns how many were reclaimed.
    pub fn sweep(&self) -> usize {
        self.sessions.sweep(self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use std::time::Instant;

    const IDLE_TTL: Duration = Duration::from_secs(1800);

    fn tracker() -> (SessionTracker, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(Instant::now()));
        (SessionTracker::new(IDLE_TTL, clock.clone()), clock)
    }

    #[test]
    fn test_touch_creates_and_activates() {
        let (tracker, _clock) = tracker();
        let id = Identity::new("client-a");

        assert!(!tracker.is_active(&id));
        let info = tracker.touch(&id);
        assert!(tracker.is_active(&id));
        assert_eq!(info.request_count, 1);
        assert_eq!(info.age, Duration::ZERO);
    }

    #[test]
    fn test_repeated_touch_keeps_session_alive() {
        let (tracker, clock) = tracker();
        let id = Identity::new("client-a");

        tracker.touch(&id);
        for _ in 0..3 {
            clock.advance(Duration::from_secs(1700));
            tracker.touch(&id);
            assert!(tracker.is_active(&id));
        }

        let info = tracker.snapshot(&id).unwrap();
        assert_eq!(info.request_count, 4);
        assert_eq!(info.age, Duration::from_secs(3 * 1700));
    }

    #[test]
    fn test_idle_session_expires() {
        let (tracker, clock) = tracker();
        let id = Identity::new("client-a");

        tracker.touch(&id);
        clock.advance(IDLE_TTL);
        assert!(!tracker.is_active(&id));
        assert!(tracker.snapshot(&id).is_none());
    }

    #[test]
    fn test_expired_session_restarts_fresh() {
        let (tracker, clock) = tracker();
        let id = Identity::new("client-a");

        tracker.touch(&id);
        tracker.touch(&id);
        clock.advance(IDLE_TTL + Duration::from_secs(1));

        // A new session starts counting from one.
        let info = tracker.touch(&id);
        assert_eq!(info.request_count, 1);
        assert_eq!(info.age, Duration::ZERO);
    }

    #[test]
    fn test_invalidate() {
        let (tracker, _clock) = tracker();
        let id = Identity::new("client-a");

        tracker.touch(&id);
        assert!(tracker.invalidate(&id));
        assert!(!tracker.is_active(&id));
        assert!(!tracker.invalidate(&id));
    }

    #[test]
    fn test_sweep_reclaims_idle_sessions() {
        let (tracker, clock) = tracker();

        tracker.touch(&Identity::new("a"));
        tracker.touch(&Identity::new("b"));
        clock.advance(Duration::from_secs(600));
        tracker.touch(&Identity::new("b"));

        clock.advance(IDLE_TTL - Duration::from_secs(300));
        // "a" has been idle past the ttl; "b" has not.
        assert_eq!(tracker.sweep(), 1);
        assert_eq!(tracker.tracked_sessions(), 1);
        assert!(tracker.is_active(&Identity::new("b")));
    }
}
