//! # Gatekeeper Infrastructure
//!
//! Concrete implementations of the ports defined in `gatekeeper-core`.
//! The limiter is single-process and in-memory: all state is lost on restart.
//!
//! ## Feature Flags
//!
//! - `test-helpers` - Exposes [`ManualClock`] for deterministic tests in other crates

pub mod clock;
pub mod rate_limit;

pub use clock::SystemClock;
pub use rate_limit::{CategoryRateLimiter, RateLimiterConfig, SweeperError};

#[cfg(any(test, feature = "test-helpers"))]
pub use clock::ManualClock;
