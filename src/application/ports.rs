//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces the application
//! layer needs. Infrastructure adapters implement them.

use std::fmt::Debug;
use std::time::Instant;

/// Port for obtaining current time.
///
/// This abstraction lets the application layer reason about window expiry,
/// cache ttl, and session idling without depending on the system clock.
/// Infrastructure provides concrete implementations (`SystemClock`,
/// `MockClock`).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}
