use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request};
use uuid::Uuid;

use portico_core::{Principal, RouteDefinition, TenantContext};

/// Rate-limit outcome attached to the exchange so the response can carry
/// the standard `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u64,
    pub remaining: u64,
    /// Absolute window end, seconds since the Unix epoch.
    pub reset_epoch: i64,
}

/// The mutable per-request context threaded through the filter pipeline.
///
/// Pre-filters populate it (principal, tenant, route); the proxy consumes
/// the request body; post-filters read it while decorating the response.
pub struct Exchange {
    pub method: Method,

    /// Path as received from the client, including any tenant slug.
    pub original_path: String,

    /// Effective path used for route matching and forwarding. The tenant
    /// slug filter strips the slug segment from this copy.
    pub path: String,

    /// Raw query string, without the leading `?`.
    pub query: Option<String>,

    pub headers: HeaderMap,

    /// Request body, taken by the proxy when forwarding. `None` after the
    /// upstream call, and for exchanges that short-circuited.
    pub body: Option<Body>,

    pub client_ip: Option<IpAddr>,

    /// From the `X-Correlation-ID` request header, or generated.
    pub correlation_id: String,

    pub received_at: Instant,

    pub principal: Option<Principal>,
    pub tenant: Option<TenantContext>,
    pub route: Option<Arc<RouteDefinition>>,
    pub rate_limit: Option<RateLimitHeaders>,

    /// Whether the response came from an upstream (as opposed to a
    /// short-circuit). Post-filters that only make sense on upstream
    /// responses check this.
    pub upstream_called: bool,
}

impl Exchange {
    /// Build an exchange from an incoming request, consuming its body.
    pub fn from_request(req: Request<Body>, client_ip: Option<IpAddr>) -> Self {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_owned();
        let query = parts.uri.query().map(str::to_owned);

        let correlation_id = parts
            .headers
            .get("x-correlation-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

        Self {
            method: parts.method,
            original_path: path.clone(),
            path,
            query,
            headers: parts.headers,
            body: Some(body),
            client_ip,
            correlation_id,
            received_at: Instant::now(),
            principal: None,
            tenant: None,
            route: None,
            rate_limit: None,
            upstream_called: false,
        }
    }

    /// The requested relationship names from the `include` query parameter,
    /// split on commas. Empty when the parameter is absent.
    #[must_use]
    pub fn include_params(&self) -> Vec<String> {
        let Some(query) = &self.query else {
            return Vec::new();
        };

        query
            .split('&')
            .filter_map(|pair| pair.strip_prefix("include="))
            .flat_map(|names| names.split(','))
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Identity used for the rate-limit counter key.
    #[must_use]
    pub fn principal_id(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.username.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange_with_query(query: &str) -> Exchange {
        let req = Request::builder()
            .uri(format!("/api/posts/1?{query}"))
            .body(Body::empty())
            .unwrap();
        Exchange::from_request(req, None)
    }

    #[test]
    fn parses_include_parameter() {
        let ex = exchange_with_query("include=author,comments&sort=-created");
        assert_eq!(ex.include_params(), vec!["author", "comments"]);

        let ex = exchange_with_query("sort=-created");
        assert!(ex.include_params().is_empty());
    }

    #[test]
    fn correlation_id_honored_or_generated() {
        let req = Request::builder()
            .uri("/api/users")
            .header("X-Correlation-ID", "corr-abc")
            .body(Body::empty())
            .unwrap();
        let ex = Exchange::from_request(req, None);
        assert_eq!(ex.correlation_id, "corr-abc");

        let req = Request::builder()
            .uri("/api/users")
            .body(Body::empty())
            .unwrap();
        let ex = Exchange::from_request(req, None);
        assert!(!ex.correlation_id.is_empty());
    }
}
