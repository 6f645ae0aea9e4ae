//! Request classification: which client sent a request, and which category it targets.

use std::net::{IpAddr, SocketAddr};

use super::policy::DEFAULT_CATEGORY;

/// Client key used when a request carries no peer address at all.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Category of a request path.
///
/// The first non-empty segment after `api_prefix` names the category. Paths
/// outside the prefix are classified by their own first segment, and an empty
/// remainder falls back to [`DEFAULT_CATEGORY`].
pub fn classify<'a>(path: &'a str, api_prefix: &str) -> &'a str {
    let prefix = api_prefix.trim_end_matches('/');
    let rest = match path.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => path,
    };

    rest.split('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
}

/// Client key for a raw peer address, with any port removed.
///
/// Anything that does not look like an address is returned verbatim so that
/// a strange peer string is still accounted for instead of failing the request.
pub fn client_key_from_peer(raw: &str) -> String {
    let raw = raw.trim();

    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    if let Ok(ip) = raw.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        return ip.to_string();
    }
    if let Some((host, port)) = raw.rsplit_once(':') {
        if !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok() {
            return host.to_owned();
        }
    }

    raw.to_owned()
}

/// First non-empty hop of an `X-Forwarded-For` value.
pub fn first_forwarded_hop(header: &str) -> Option<&str> {
    header
        .split(',')
        .map(str::trim)
        .find(|hop| !hop.is_empty())
}
