//! Client identity and category of an incoming request.

use actix_web::dev::ServiceRequest;
use gatekeeper_core::domain::{
    UNKNOWN_CLIENT, classify, client_key_from_peer, first_forwarded_hop,
};

use crate::config::env_flag;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Derives the `(client key, category)` pair the limiter accounts a request under.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    api_prefix: String,
    trust_forwarded: bool,
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new("/api", false)
    }
}

impl RequestClassifier {
    pub fn new(api_prefix: impl Into<String>, trust_forwarded: bool) -> Self {
        Self {
            api_prefix: api_prefix.into(),
            trust_forwarded,
        }
    }

    /// Load from `RATE_LIMIT_API_PREFIX` and `RATE_LIMIT_TRUST_FORWARDED`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("RATE_LIMIT_API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            env_flag("RATE_LIMIT_TRUST_FORWARDED", false),
        )
    }

    /// Client key of the request.
    ///
    /// `X-Forwarded-For` is spoofable, so its first hop is only used when the
    /// server sits behind a proxy that sets it.
    pub fn client_key(&self, req: &ServiceRequest) -> String {
        if self.trust_forwarded {
            let hop = req
                .headers()
                .get(FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(first_forwarded_hop);
            if let Some(hop) = hop {
                return client_key_from_peer(hop);
            }
        }

        match req.peer_addr() {
            Some(addr) => addr.ip().to_string(),
            None => req
                .connection_info()
                .peer_addr()
                .map(client_key_from_peer)
                .unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
        }
    }

    pub fn category<'a>(&self, path: &'a str) -> &'a str {
        classify(path, &self.api_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_peer_address_without_port() {
        let req = TestRequest::default()
            .peer_addr("203.0.113.5:51234".parse().unwrap())
            .to_srv_request();

        assert_eq!(RequestClassifier::default().client_key(&req), "203.0.113.5");
    }

    #[test]
    fn test_forwarded_header_ignored_by_default() {
        let req = TestRequest::default()
            .peer_addr("10.0.0.2:80".parse().unwrap())
            .insert_header((FORWARDED_FOR, "198.51.100.7"))
            .to_srv_request();

        assert_eq!(RequestClassifier::default().client_key(&req), "10.0.0.2");
    }

    #[test]
    fn test_trusted_forwarded_header_uses_first_hop() {
        let classifier = RequestClassifier::new("/api", true);
        let req = TestRequest::default()
            .peer_addr("10.0.0.2:80".parse().unwrap())
            .insert_header((FORWARDED_FOR, "198.51.100.7:3000, 10.0.0.1"))
            .to_srv_request();

        assert_eq!(classifier.client_key(&req), "198.51.100.7");
    }

    #[test]
    fn test_trusted_but_missing_header_falls_back_to_peer() {
        let classifier = RequestClassifier::new("/api", true);
        let req = TestRequest::default()
            .peer_addr("10.0.0.2:80".parse().unwrap())
            .to_srv_request();

        assert_eq!(classifier.client_key(&req), "10.0.0.2");
    }

    #[test]
    fn test_missing_peer_shares_unknown_key() {
        let req = TestRequest::default().to_srv_request();
        assert_eq!(RequestClassifier::default().client_key(&req), UNKNOWN_CLIENT);

        let spoofed = TestRequest::default()
            .insert_header((FORWARDED_FOR, "198.51.100.7"))
            .to_srv_request();
        assert_eq!(RequestClassifier::default().client_key(&spoofed), "unknown");
    }

    #[test]
    fn test_category_uses_configured_prefix() {
        let classifier = RequestClassifier::new("/v1", false);

        assert_eq!(classifier.category("/v1/posts/3"), "posts");
        assert_eq!(classifier.category("/v1"), "default");
        assert_eq!(RequestClassifier::default().category("/api/auth/login"), "auth");
    }
}
