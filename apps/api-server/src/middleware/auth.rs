//! Operator authentication for the admin endpoints.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use std::future::{Ready, ready};

use super::error::AppError;

/// Bearer token accepted by the admin scope.
#[derive(Debug, Clone)]
pub struct AdminToken(String);

impl AdminToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        expected.len() == presented.len()
            && expected
                .iter()
                .zip(presented)
                .fold(0u8, |diff, (a, b)| diff | (a ^ b))
                == 0
    }
}

/// Extractor proving the request carries the operator token.
///
/// Add it as a handler argument to require authentication:
/// ```ignore
/// async fn stats(_operator: Operator, state: web::Data<AppState>) -> HttpResponse { .. }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Operator;

impl FromRequest for Operator {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(expected) = req.app_data::<web::Data<AdminToken>>() else {
            tracing::error!("AdminToken not found in app data");
            return ready(Err(AppError::Unauthorized));
        };

        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match token {
            Some(token) if expected.matches(token.trim()) => ready(Ok(Operator)),
            _ => {
                tracing::warn!(path = %req.path(), "Rejected unauthenticated operator request");
                ready(Err(AppError::Unauthorized))
            }
        }
    }
}
