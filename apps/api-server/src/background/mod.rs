//! Background jobs.

#[cfg(feature = "scheduler")]
pub mod stats_report;

#[cfg(feature = "scheduler")]
pub use stats_report::StatsReporter;
