//! Rate limiting middleware.

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER},
};
use gatekeeper_core::domain::Decision;
use gatekeeper_core::ports::RateLimiter;
use gatekeeper_shared::ApiResponse;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::sync::Arc;

use super::client::RequestClassifier;

/// Rate limiting middleware factory.
///
/// Register it as the last `.wrap(...)` so it runs before every other
/// middleware.
pub struct RateLimitMiddleware {
    limiter: Arc<dyn RateLimiter>,
    classifier: RequestClassifier,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<dyn RateLimiter>, classifier: RequestClassifier) -> Self {
        Self {
            limiter,
            classifier,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service,
            limiter: self.limiter.clone(),
            classifier: self.classifier.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: S,
    limiter: Arc<dyn RateLimiter>,
    classifier: RequestClassifier,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client = self.classifier.client_key(&req);
        let category = self.classifier.category(req.path());
        let decision = self.limiter.check(&client, category);

        if !decision.allowed() {
            let retry_after = decision.retry_after();
            let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);

            let mut response = HttpResponse::TooManyRequests()
                .insert_header((RETRY_AFTER, retry_secs))
                .json(ApiResponse::failure(decision.rejection_message()));
            insert_headers(response.headers_mut(), &decision);

            let (http_req, _payload) = req.into_parts();
            let srv_response = ServiceResponse::new(http_req, response);

            return Box::pin(async move { Ok(srv_response.map_into_right_body()) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            insert_headers(res.headers_mut(), &decision);
            Ok(res.map_into_left_body())
        })
    }
}

fn insert_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(decision.remaining()),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(decision.reset_timestamp()),
    );
}
