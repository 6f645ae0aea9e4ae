//! Application state - shared across all handlers.

use std::sync::Arc;

use gatekeeper_core::PolicyError;
use gatekeeper_core::ports::RateLimiter;
use gatekeeper_infra::CategoryRateLimiter;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<CategoryRateLimiter>,
}

impl AppState {
    /// Build the limiter from configuration and apply startup policy overrides.
    ///
    /// An override the limiter refuses (zero budget or window) is logged and
    /// skipped; the seeded policy for that category stays in place.
    pub fn build(config: &AppConfig) -> Result<Self, PolicyError> {
        let limiter = CategoryRateLimiter::new(config.limiter.clone())?;

        for o in &config.policy_overrides {
            if let Err(e) = limiter.set_policy(&o.category, o.max_requests, o.window) {
                tracing::warn!(
                    category = %o.category,
                    error = %e,
                    "Rejected policy override"
                );
            }
        }

        tracing::info!(
            profile = config.limiter.profile.as_str(),
            max_visitors = config.limiter.max_visitors,
            "Application state initialized"
        );

        Ok(Self::with_limiter(Arc::new(limiter)))
    }

    pub fn with_limiter(limiter: Arc<CategoryRateLimiter>) -> Self {
        Self { limiter }
    }

    /// The limiter behind the port the middleware depends on.
    pub fn rate_limiter(&self) -> Arc<dyn RateLimiter> {
        self.limiter.clone()
    }
}
