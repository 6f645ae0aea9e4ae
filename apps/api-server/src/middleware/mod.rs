//! Middleware modules.

pub mod auth;
pub mod client;
pub mod error;
pub mod rate_limit;

pub use auth::{AdminToken, Operator};
pub use client::RequestClassifier;
pub use rate_limit::RateLimitMiddleware;
