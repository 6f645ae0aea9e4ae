//! Admission control port.

use crate::domain::Decision;

/// Rate limiter trait - the seam between HTTP middleware and the limiter engine.
///
/// A check always records the request: the returned [`Decision`] already
/// includes it in `count`. Checks are synchronous and never fail; a limiter
/// that cannot account for a request must still return a decision.
pub trait RateLimiter: Send + Sync {
    /// Account one request from `client_key` against `category`.
    fn check(&self, client_key: &str, category: &str) -> Decision;
}
