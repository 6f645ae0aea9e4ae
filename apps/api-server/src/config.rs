//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use gatekeeper_infra::RateLimiterConfig;

use crate::middleware::{AdminToken, RequestClassifier};

const POLICY_PREFIX: &str = "RATE_LIMIT_POLICY_";

/// Startup override of one category policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOverride {
    pub category: String,
    pub max_requests: u32,
    pub window: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub limiter: RateLimiterConfig,
    pub classifier: RequestClassifier,
    pub policy_overrides: Vec<PolicyOverride>,
    pub admin_enabled: bool,
    pub admin_token: Option<String>,
    pub stats_report_cron: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            limiter: RateLimiterConfig::from_env(),
            classifier: RequestClassifier::from_env(),
            policy_overrides: Self::parse_policy_overrides(env::vars()),
            admin_enabled: env_flag("ADMIN_ENDPOINTS_ENABLED", false),
            admin_token: env::var("ADMIN_TOKEN").ok(),
            stats_report_cron: env::var("STATS_REPORT_CRON")
                .unwrap_or_else(|_| "0 */5 * * * *".to_string()),
        }
    }

    /// Token guarding the operator endpoints, or `None` when they stay
    /// unmounted. Enabling them without a token leaves them off.
    pub fn operator_token(&self) -> Option<AdminToken> {
        if !self.admin_enabled {
            return None;
        }

        match self.admin_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Some(AdminToken::new(token)),
            _ => {
                tracing::warn!(
                    "ADMIN_ENDPOINTS_ENABLED is set but ADMIN_TOKEN is empty; operator endpoints stay off"
                );
                None
            }
        }
    }

    /// Collect policy overrides.
    /// Format: RATE_LIMIT_POLICY_<CATEGORY>=<MAX_REQUESTS>,<WINDOW_SECS>
    /// Example: RATE_LIMIT_POLICY_POSTS=30,3600
    fn parse_policy_overrides<I>(vars: I) -> Vec<PolicyOverride>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut overrides = Vec::new();

        for (key, value) in vars {
            let Some(name) = key.strip_prefix(POLICY_PREFIX) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            match parse_policy_override(&value) {
                Some((max_requests, window_secs)) => overrides.push(PolicyOverride {
                    category: name.to_lowercase(),
                    max_requests,
                    window: Duration::from_secs(window_secs),
                }),
                None => tracing::warn!(
                    variable = %key,
                    value = %value,
                    "Ignoring malformed policy override, expected <max_requests>,<window_secs>"
                ),
            }
        }

        overrides.sort_by(|a, b| a.category.cmp(&b.category));
        overrides
    }
}

/// Parse `<max_requests>,<window_secs>`.
pub fn parse_policy_override(value: &str) -> Option<(u32, u64)> {
    let (max, window) = value.split_once(',')?;
    Some((max.trim().parse().ok()?, window.trim().parse().ok()?))
}

/// Boolean environment flag; anything except `false`/`0` counts as set.
pub fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}
