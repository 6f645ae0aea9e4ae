//! Domain entities - policies, classification and decision accounting.

mod classify;
mod decision;
mod policy;
mod stats;

pub use classify::{UNKNOWN_CLIENT, classify, client_key_from_peer, first_forwarded_hop};
pub use decision::Decision;
pub use policy::{
    CategoryPolicy, DEFAULT_CATEGORY, PolicyProfile, format_window, format_window_compact,
};
pub use stats::LimiterStats;
