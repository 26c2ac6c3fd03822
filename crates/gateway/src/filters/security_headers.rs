use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Response};

use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::pipeline::Filter;

/// The fixed security header set, applied to every response regardless of
/// status or origin (upstream, short-circuit, or error envelope).
const SECURITY_HEADERS: [(&str, &str); 7] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains",
    ),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "permissions-policy",
        "camera=(), microphone=(), geolocation=()",
    ),
    ("cache-control", "no-store"),
    ("pragma", "no-cache"),
];

/// Insert the security headers, overwriting anything the upstream set.
pub fn apply(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

/// Response security headers.
pub struct SecurityHeadersFilter;

#[async_trait]
impl Filter for SecurityHeadersFilter {
    fn name(&self) -> &'static str {
        "security-headers"
    }

    fn order(&self) -> i32 {
        super::ORDER_SECURITY_HEADERS
    }

    async fn post(
        &self,
        _exchange: &mut Exchange,
        mut response: Response<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        apply(response.headers_mut());
        Ok(response)
    }
}
