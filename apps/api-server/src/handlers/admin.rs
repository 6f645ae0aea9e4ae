//! Operator endpoints for inspecting and tuning the rate limiter.

use std::time::Duration;

use actix_web::{HttpResponse, web};
use gatekeeper_core::domain::{CategoryPolicy, format_window};
use gatekeeper_shared::ApiResponse;
use gatekeeper_shared::dto::{PolicyView, UpdatePolicyRequest};

use crate::middleware::Operator;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const MAX_CATEGORY_LEN: usize = 32;

/// Category names are single lowercase path segments, as `classify` produces them.
fn validate_category(category: &str) -> AppResult<()> {
    let valid = !category.is_empty()
        && category.len() <= MAX_CATEGORY_LEN
        && category
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid category '{category}': use up to {MAX_CATEGORY_LEN} lowercase letters, digits, '-' or '_'"
        )))
    }
}

fn view(category: String, policy: CategoryPolicy) -> PolicyView {
    PolicyView {
        category,
        max_requests: policy.max_requests,
        window_secs: policy.window.as_secs(),
        window: format_window(policy.window),
    }
}

/// GET /api/admin/rate-limits
pub async fn list_policies(_operator: Operator, state: web::Data<AppState>) -> HttpResponse {
    let policies: Vec<PolicyView> = state
        .limiter
        .list_policies()
        .into_iter()
        .map(|(category, policy)| view(category, policy))
        .collect();

    HttpResponse::Ok().json(ApiResponse::ok("Rate limit policies", policies))
}

/// PUT /api/admin/rate-limits/{category}
pub async fn update_policy(
    _operator: Operator,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdatePolicyRequest>,
) -> AppResult<HttpResponse> {
    let category = path.into_inner();
    validate_category(&category)?;
    let req = body.into_inner();

    let policy = state.limiter.set_policy(
        &category,
        req.max_requests,
        Duration::from_secs(req.window_secs),
    )?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Rate limit policy updated",
        view(category, policy),
    )))
}

/// GET /api/admin/rate-limits/stats
pub async fn stats(_operator: Operator, state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(
        "Rate limiter statistics",
        state.limiter.stats(),
    ))
}
