//! Fixed-window, per-category rate limiting.
//!
//! A request is accounted against the counter its client holds for the
//! request's category. A counter resets once the window has elapsed since the
//! client's previous request in that category, so a burst straddling a reset
//! can reach close to twice the budget.

mod limiter;
mod policy;
mod store;
mod sweeper;
mod visitor;

pub use limiter::{CategoryRateLimiter, RateLimiterConfig};
pub use policy::PolicyRegistry;
pub use store::VisitorStore;
pub use sweeper::SweeperError;
pub use visitor::Visitor;
