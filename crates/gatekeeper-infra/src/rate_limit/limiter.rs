//! Admission decision engine.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use gatekeeper_core::PolicyError;
use gatekeeper_core::domain::{CategoryPolicy, Decision, LimiterStats, PolicyProfile};
use gatekeeper_core::ports::{Clock, RateLimiter};

use super::policy::PolicyRegistry;
use super::store::VisitorStore;
use super::sweeper::{Sweeper, SweeperError};
use crate::clock::SystemClock;

/// Limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Seed table for category policies.
    pub profile: PolicyProfile,
    /// Maximum number of tracked clients.
    pub max_visitors: usize,
    /// Period of the background staleness sweep.
    pub sweep_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            profile: PolicyProfile::Development,
            max_visitors: 10_000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimiterConfig {
    /// Load from `RATE_LIMIT_PROFILE`, `RATE_LIMIT_MAX_VISITORS` and
    /// `RATE_LIMIT_SWEEP_INTERVAL_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let profile = match std::env::var("RATE_LIMIT_PROFILE") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}; using {}", e, defaults.profile.as_str());
                defaults.profile
            }),
            Err(_) => defaults.profile,
        };

        Self {
            profile,
            max_visitors: env_parse("RATE_LIMIT_MAX_VISITORS").unwrap_or(defaults.max_visitors),
            sweep_interval: env_parse("RATE_LIMIT_SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        }
    }
}

/// Parsed value of `name`, warning when it is set but malformed.
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring malformed value");
            None
        }
    }
}

/// Per-category fixed-window rate limiter.
///
/// Construct one per process (or per test) and share it behind an `Arc`.
/// Call [`start`](Self::start) once a Tokio runtime is available to enable
/// the background sweep.
#[derive(Debug)]
pub struct CategoryRateLimiter {
    policies: Arc<PolicyRegistry>,
    store: Arc<VisitorStore>,
    clock: Arc<dyn Clock>,
    sweeper: Sweeper,
}

impl CategoryRateLimiter {
    pub fn new(config: RateLimiterConfig) -> Result<Self, PolicyError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: RateLimiterConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PolicyError> {
        if config.sweep_interval.is_zero() {
            return Err(PolicyError::ZeroSweepInterval);
        }

        Ok(Self {
            policies: Arc::new(PolicyRegistry::from_profile(config.profile)),
            store: Arc::new(VisitorStore::new(config.max_visitors)?),
            clock,
            sweeper: Sweeper::new(config.sweep_interval),
        })
    }

    pub fn get_policy(&self, category: &str) -> CategoryPolicy {
        self.policies.get_policy(category)
    }

    pub fn set_policy(
        &self,
        category: &str,
        max_requests: u32,
        window: Duration,
    ) -> Result<CategoryPolicy, PolicyError> {
        self.policies.set_policy(category, max_requests, window)
    }

    pub fn list_policies(&self) -> BTreeMap<String, CategoryPolicy> {
        self.policies.list_policies()
    }

    pub fn set_max_visitors(&self, max_visitors: usize) -> Result<usize, PolicyError> {
        self.store.set_max_visitors(max_visitors)
    }

    pub fn visitors(&self) -> &VisitorStore {
        &self.store
    }

    pub fn stats(&self) -> LimiterStats {
        self.store.stats()
    }

    pub fn dump_policies(&self) -> String {
        self.policies.dump()
    }

    pub fn dump_visitors(&self) -> String {
        self.store.dump(self.clock.now())
    }

    pub fn reset_visitor(&self, client_key: &str) -> bool {
        self.store.reset_visitor(client_key)
    }

    pub fn reset_all(&self) {
        self.store.reset_all();
    }

    /// Run one staleness sweep now. Returns the number of visitors removed.
    pub fn sweep(&self) -> usize {
        self.store.sweep(&self.policies, self.clock.now())
    }

    /// Start the background sweep. Idempotent: returns `Ok(false)` if it is
    /// already running.
    pub fn start(&self) -> Result<bool, SweeperError> {
        self.sweeper.start(
            Arc::clone(&self.store),
            Arc::clone(&self.policies),
            Arc::clone(&self.clock),
        )
    }

    /// Stop the background sweep and wait for it to finish.
    pub async fn stop(&self) -> bool {
        self.sweeper.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.sweeper.is_running()
    }
}

impl RateLimiter for CategoryRateLimiter {
    fn check(&self, client_key: &str, category: &str) -> Decision {
        let policy = self.policies.get_policy(category);
        let now = self.clock.now();
        let count = self
            .store
            .get_or_create(client_key, now)
            .check_and_increment(category, now, &policy);

        let decision = Decision {
            category: category.to_owned(),
            limit: policy.max_requests,
            count,
            window: policy.window,
            decided_at: now,
            reset_at: policy.reset_at(now),
        };

        if !decision.allowed() {
            tracing::warn!(
                client = client_key,
                category,
                count,
                limit = policy.max_requests,
                "Rate limit exceeded"
            );
        }
        decision
    }
}
