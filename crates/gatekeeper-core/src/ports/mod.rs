//! Ports - trait definitions the infrastructure layer implements.

mod clock;
mod rate_limit;

pub use clock::Clock;
pub use rate_limit::RateLimiter;
