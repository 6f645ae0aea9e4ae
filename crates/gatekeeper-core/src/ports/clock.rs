use chrono::{DateTime, Utc};

/// Source of the current time, injected so tests can move time explicitly.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}
