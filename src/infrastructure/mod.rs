//! Infrastructure layer - adapters over external facilities.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Concurrent expiring key-value storage

pub mod clock;
pub mod store;

/// Mock implementations for testing.
///
/// Only available when the `test-helpers` feature is enabled, or during
/// test builds. To use the mocks in integration tests, add to `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// market-governor = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
