use std::fmt::{self, Write};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::PolicyError;

/// Category used when a request's category has no policy of its own.
pub const DEFAULT_CATEGORY: &str = "default";

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Request budget for one category: at most `max_requests` per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl CategoryPolicy {
    /// Create a validated policy.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, PolicyError> {
        if max_requests == 0 {
            return Err(PolicyError::ZeroBudget);
        }
        if window.is_zero() {
            return Err(PolicyError::ZeroWindow);
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    /// Whether a counter last touched at `last_seen` has outlived this window.
    ///
    /// Elapsed time equal to the window is still inside it. A clock that
    /// moved backwards yields negative elapsed time, which is never stale.
    pub fn is_stale(&self, last_seen: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - last_seen)
            .to_std()
            .map(|elapsed| elapsed > self.window)
            .unwrap_or(false)
    }

    /// Instant at which a counter last touched at `last_seen` resets.
    pub fn reset_at(&self, last_seen: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.window)
            .ok()
            .and_then(|window| last_seen.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: MINUTE,
        }
    }
}

impl fmt::Display for CategoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests per {}",
            self.max_requests,
            format_window(self.window)
        )
    }
}

/// Named seed table of category policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyProfile {
    /// Short windows, convenient while developing against the API.
    #[default]
    Development,
    /// Longer windows on write-heavy categories to stop spam and brute force.
    Production,
}

impl PolicyProfile {
    /// The policies this profile seeds, `default` included.
    pub fn policies(self) -> Vec<(&'static str, CategoryPolicy)> {
        let policy = |max_requests, window| CategoryPolicy {
            max_requests,
            window,
        };

        match self {
            Self::Development => vec![
                ("auth", policy(5, 15 * MINUTE)),
                ("posts", policy(10, MINUTE)),
                ("comments", policy(15, MINUTE)),
                ("users", policy(20, MINUTE)),
                ("categories", policy(50, MINUTE)),
                (DEFAULT_CATEGORY, policy(10, MINUTE)),
            ],
            Self::Production => vec![
                ("auth", policy(5, 5 * MINUTE)),
                ("posts", policy(10, HOUR)),
                ("comments", policy(30, HOUR)),
                ("users", policy(60, MINUTE)),
                ("categories", policy(100, MINUTE)),
                (DEFAULT_CATEGORY, policy(20, MINUTE)),
            ],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for PolicyProfile {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(PolicyError::UnknownProfile(other.to_owned())),
        }
    }
}

/// Formats a window the way rejection messages print it: `15m0s`, `1h0m0s`,
/// `1.5s`, `250ms`.
pub fn format_window(window: Duration) -> String {
    let nanos = window.as_nanos();
    if nanos == 0 {
        return "0s".to_owned();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let total_secs = window.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs_nanos = u128::from(total_secs % 60) * 1_000_000_000 + u128::from(window.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h{minutes}m");
    } else if minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{}s", decimal(secs_nanos, 1_000_000_000));
    out
}

/// Formats a window in whole units for operator tables: `45s`, `15m`, `1h`.
pub fn format_window_compact(window: Duration) -> String {
    if window < MINUTE {
        format!("{}s", window.as_secs())
    } else if window < HOUR {
        format!("{}m", window.as_secs() / 60)
    } else {
        format!("{}h", window.as_secs() / 3600)
    }
}

fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }

    let width = unit.ilog10() as usize;
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
