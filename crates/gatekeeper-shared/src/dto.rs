//! Data Transfer Objects for the operator endpoints.

use serde::{Deserialize, Serialize};

/// One category policy as exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyView {
    pub category: String,
    pub max_requests: u32,
    pub window_secs: u64,
    /// Human-readable window, e.g. `15m0s`.
    pub window: String,
}

/// Body of `PUT /api/admin/rate-limits/{category}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePolicyRequest {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// Response of the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub limiter_running: bool,
}
