//! HTTP handlers and route configuration.

mod admin;
mod health;

use actix_web::{HttpRequest, web};

use crate::middleware::AdminToken;
use crate::middleware::error::{AppError, AppResult};

/// Configure all application routes.
///
/// The operator endpoints are mounted only when an admin token is given,
/// and every one of them requires it as a Bearer token.
pub fn configure_routes(cfg: &mut web::ServiceConfig, admin_token: Option<AdminToken>) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }));

    let mut api = web::scope("/api").route("/health", web::get().to(health::health_check));

    if let Some(token) = admin_token {
        api = api.service(
            web::scope("/admin/rate-limits")
                .app_data(web::Data::new(token))
                .route("", web::get().to(admin::list_policies))
                .route("/stats", web::get().to(admin::stats))
                .route("/{category}", web::put().to(admin::update_policy)),
        );
    }

    cfg.service(api).default_service(web::to(not_found));
}

async fn not_found(req: HttpRequest) -> AppResult<actix_web::HttpResponse> {
    Err(AppError::NotFound(format!(
        "No route for {} {}",
        req.method(),
        req.path()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{RateLimitMiddleware, RequestClassifier};
    use crate::state::AppState;
    use actix_web::{App, http::StatusCode, test};
    use chrono::DateTime;
    use gatekeeper_infra::{CategoryRateLimiter, ManualClock, RateLimiterConfig};
    use serde_json::{Value, json};
    use std::sync::Arc;

    const TOKEN: &str = "s3cret-operator-token";

    fn state() -> AppState {
        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let limiter =
            CategoryRateLimiter::with_clock(RateLimiterConfig::default(), Arc::new(clock))
                .unwrap();
        AppState::with_limiter(Arc::new(limiter))
    }

    macro_rules! app {
        ($state:expr, $admin:expr) => {
            test::init_service(
                App::new()
                    .wrap(RateLimitMiddleware::new(
                        $state.rate_limiter(),
                        RequestClassifier::default(),
                    ))
                    .app_data(web::Data::new($state.clone()))
                    .configure(|cfg| {
                        configure_routes(cfg, $admin.then(|| AdminToken::new(TOKEN)))
                    }),
            )
            .await
        };
    }

    fn as_operator(req: test::TestRequest) -> test::TestRequest {
        req.insert_header(("Authorization", format!("Bearer {TOKEN}")))
    }

    #[actix_web::test]
    async fn test_health_reports_ok() {
        let state = state();
        let app = app!(state, true);

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["limiter_running"], false);
    }

    #[actix_web::test]
    async fn test_list_policies_sorted() {
        let state = state();
        let app = app!(state, true);

        let req = as_operator(test::TestRequest::get().uri("/api/admin/rate-limits")).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let policies = body["data"].as_array().unwrap();
        assert_eq!(policies.len(), 6);
        assert_eq!(
            policies[0],
            json!({"category": "auth", "max_requests": 5, "window_secs": 900, "window": "15m0s"})
        );
    }

    #[actix_web::test]
    async fn test_update_policy_applies_immediately() {
        let state = state();
        let app = app!(state, true);

        let req = as_operator(test::TestRequest::put())
            .uri("/api/admin/rate-limits/votes")
            .set_json(json!({"max_requests": 3, "window_secs": 120}))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["data"]["window"], "2m0s");
        assert_eq!(state.limiter.get_policy("votes").max_requests, 3);
    }

    #[actix_web::test]
    async fn test_update_policy_rejects_zero_budget() {
        let state = state();
        let app = app!(state, true);

        let req = as_operator(test::TestRequest::put())
            .uri("/api/admin/rate-limits/auth")
            .set_json(json!({"max_requests": 0, "window_secs": 60}))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(state.limiter.get_policy("auth").max_requests, 5);
    }

    #[actix_web::test]
    async fn test_malformed_body_is_bad_request_envelope() {
        let state = state();
        let app = app!(state, true);

        let req = as_operator(test::TestRequest::put())
            .uri("/api/admin/rate-limits/auth")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"max_requests\": \"many\"}")
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["message"], "Request failed");
    }

    #[actix_web::test]
    async fn test_stats_counts_visitors() {
        let state = state();
        let app = app!(state, true);

        let req = as_operator(test::TestRequest::get())
            .uri("/api/admin/rate-limits/stats")
            .peer_addr("203.0.113.5:4000".parse().unwrap())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["total_visitors"], 1);
        assert_eq!(body["data"]["max_visitors"], 10_000);
        assert_eq!(body["data"]["categories"]["admin"], 1);
    }

    #[actix_web::test]
    async fn test_admin_routes_can_be_disabled() {
        let state = state();
        let app = app!(state, false);

        let req = test::TestRequest::get()
            .uri("/api/admin/rate-limits")
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "No route for GET /api/admin/rate-limits");
    }

    #[actix_web::test]
    async fn test_anonymous_client_cannot_lift_auth_limit() {
        let state = state();
        let app = app!(state, true);
        let attacker = "198.51.100.66:4000";

        let req = test::TestRequest::put()
            .uri("/api/admin/rate-limits/auth")
            .peer_addr(attacker.parse().unwrap())
            .set_json(json!({"max_requests": u32::MAX, "window_secs": 1}))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(state.limiter.get_policy("auth").max_requests, 5);

        let mut rejected = 0;
        for _ in 0..20 {
            let req = test::TestRequest::post()
                .uri("/api/auth/login")
                .peer_addr(attacker.parse().unwrap())
                .to_request();
            if test::call_service(&app, req).await.status() == StatusCode::TOO_MANY_REQUESTS {
                rejected += 1;
            }
        }
        assert_eq!(rejected, 15);
    }

    #[actix_web::test]
    async fn test_wrong_token_is_refused() {
        let state = state();
        let app = app!(state, true);

        let req = test::TestRequest::put()
            .uri("/api/admin/rate-limits/votes")
            .insert_header(("Authorization", "Bearer guess"))
            .set_json(json!({"max_requests": 3, "window_secs": 120}))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(!state.limiter.list_policies().contains_key("votes"));
    }

    #[actix_web::test]
    async fn test_read_endpoints_require_token() {
        let state = state();
        let app = app!(state, true);

        for uri in ["/api/admin/rate-limits", "/api/admin/rate-limits/stats"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[actix_web::test]
    async fn test_update_policy_rejects_invalid_category() {
        let state = state();
        let app = app!(state, true);

        let req = as_operator(test::TestRequest::put())
            .uri("/api/admin/rate-limits/Not%20A%20Category")
            .set_json(json!({"max_requests": 3, "window_secs": 60}))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.limiter.list_policies().len(), 6);
    }
}
