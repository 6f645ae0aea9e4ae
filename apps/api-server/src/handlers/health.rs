//! Health check endpoint.

use actix_web::{HttpResponse, web};
use gatekeeper_shared::ApiResponse;
use gatekeeper_shared::dto::HealthResponse;

use crate::state::AppState;

/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        limiter_running: state.limiter.is_running(),
    };

    HttpResponse::Ok().json(ApiResponse::ok("Service is healthy", response))
}
