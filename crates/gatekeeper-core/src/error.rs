//! Domain-level error types.

use thiserror::Error;

/// Invalid limiter configuration, rejected before it reaches any shared state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("max requests must be greater than zero")]
    ZeroBudget,

    #[error("window must be greater than zero")]
    ZeroWindow,

    #[error("visitor capacity must be greater than zero")]
    ZeroCapacity,

    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,

    #[error("unknown rate limit profile: {0}")]
    UnknownProfile(String),
}
