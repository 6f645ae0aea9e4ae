//! JSON envelope used by every endpoint, rejections included.

use serde::{Deserialize, Serialize};

/// Message carried by every failed response.
pub const FAILURE_MESSAGE: &str = "Request failed";

/// `{ success, message, data?, error? }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: FAILURE_MESSAGE.to_string(),
            data: None,
            error: Some(error.into()),
        }
    }
}
