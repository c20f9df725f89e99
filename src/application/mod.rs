//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain types over the shared stores:
//! - Rate limiter (admission decisions)
//! - Response cache (ttl memoization with single-flight de-duplication)
//! - Session tracker (idle-expiry bookkeeping)
//! - Governor (the façade the request-handling layer calls)
//!
//! ## Ports
//!
//! The application layer defines the [`ports::Clock`] trait that
//! infrastructure adapters implement, keeping the orchestration logic
//! independent of the system clock.

pub mod cache;
pub mod governor;
pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod session;
