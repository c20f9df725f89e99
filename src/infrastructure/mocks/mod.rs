//! Mock implementations for testing.
//!
//! Test doubles for infrastructure adapters, enabling controlled testing of
//! time-dependent governance behavior.

pub mod clock;

pub use clock::MockClock;
