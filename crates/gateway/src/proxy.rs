use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Response, header};
use tracing::debug;

use crate::error::GatewayError;
use crate::exchange::Exchange;

/// Configuration for the upstream HTTP client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Overall per-request deadline.
    pub timeout: Duration,
    /// TCP connect deadline.
    pub connect_timeout: Duration,
    /// Bounded connection pool per backend host.
    pub pool_max_idle_per_host: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 32,
        }
    }
}

/// Forwards exchanges to backend services.
///
/// The response streams back to the client; only the JSON:API transform
/// buffers it, and only when active. Upstream status, headers, and body
/// pass through unchanged apart from hop-by-hop headers.
pub struct UpstreamClient {
    client: reqwest::Client,
    timeout_secs: u64,
}

/// Headers that must not be forwarded in either direction.
const HOP_BY_HOP: [header::HeaderName; 4] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TRAILER,
];

impl UpstreamClient {
    /// Build the client with its bounded pool and timeouts.
    pub fn new(config: &UpstreamConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build upstream client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout.as_secs(),
        })
    }

    /// Forward the exchange to its matched route's backend and return the
    /// upstream response.
    ///
    /// Consumes the exchange's request body. The caller must have matched a
    /// route already.
    pub async fn forward(&self, exchange: &mut Exchange) -> Result<Response<Body>, GatewayError> {
        let route = exchange
            .route
            .clone()
            .ok_or_else(|| GatewayError::Internal("forward called without a matched route".into()))?;

        let mut url = format!("{}{}", route.backend_url.trim_end_matches('/'), exchange.path);
        if let Some(query) = &exchange.query {
            url.push('?');
            url.push_str(query);
        }

        debug!(
            method = %exchange.method,
            url = %url,
            correlation_id = %exchange.correlation_id,
            "forwarding to upstream"
        );

        let mut request = self
            .client
            .request(exchange.method.clone(), &url)
            .headers(outbound_headers(&exchange.headers));

        if let Some(body) = exchange.body.take() {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::UpstreamTimeout(self.timeout_secs)
            } else {
                GatewayError::UpstreamConnect(e.to_string())
            }
        })?;

        exchange.upstream_called = true;

        let status = upstream.status();
        let mut response = Response::builder().status(status);
        if let Some(headers) = response.headers_mut() {
            for (name, value) in upstream.headers() {
                if !HOP_BY_HOP.contains(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }

        response
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| GatewayError::Internal(format!("failed to assemble response: {e}")))
    }
}

/// Client headers forwarded upstream. Hop-by-hop headers and `Host` are
/// dropped; the client sets `Host` from the backend URL.
fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if HOP_BY_HOP.contains(name) || name == header::HOST || name == header::CONTENT_LENGTH {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_headers_drop_hop_by_hop_and_host() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, "gateway.example.com".parse().unwrap());
        inbound.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        inbound.insert(header::ACCEPT, "application/json".parse().unwrap());
        inbound.insert("x-custom", "1".parse().unwrap());

        let out = outbound_headers(&inbound);
        assert!(!out.contains_key(header::HOST));
        assert!(!out.contains_key(header::CONNECTION));
        assert_eq!(out[header::ACCEPT], "application/json");
        assert_eq!(out["x-custom"], "1");
    }
}
