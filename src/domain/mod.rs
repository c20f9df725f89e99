//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of the governance
//! system:
//! - Client identity and normalized sector keys
//! - Sliding-window request logs and admission decisions
//! - Session liveness state
//!
//! All types in this layer are pure and easily testable.

pub mod identity;
pub mod key;
pub mod session;
pub mod window;
