use std::time::Duration;

use chrono::{DateTime, Utc};

use super::policy::format_window;

/// Accounting for one admission check.
///
/// `count` already includes the request that produced this decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub category: String,
    /// Budget of the policy the request was checked against.
    pub limit: u32,
    pub count: u32,
    pub window: Duration,
    pub decided_at: DateTime<Utc>,
    pub reset_at: DateTime<Utc>,
}

impl Decision {
    pub fn allowed(&self) -> bool {
        self.count <= self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }

    /// Unix timestamp of `reset_at`.
    pub fn reset_timestamp(&self) -> i64 {
        self.reset_at.timestamp()
    }

    /// Time left until the window resets, rounded down to zero if already past.
    pub fn retry_after(&self) -> Duration {
        (self.reset_at - self.decided_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn rejection_message(&self) -> String {
        format!(
            "Rate limit exceeded for {}: {} requests allowed per {}",
            self.category,
            self.limit,
            format_window(self.window)
        )
    }
}
