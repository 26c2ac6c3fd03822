use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use chrono::Utc;
use thiserror::Error;

/// Errors raised inside the filter pipeline.
///
/// Every variant maps to one gateway-generated error envelope. Upstream
/// errors are not represented here: non-2xx upstream responses pass through
/// to the client unchanged.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, invalid, or expired credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The principal's roles do not satisfy the route policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No route matched the request path.
    #[error("no route for path '{0}'")]
    RouteNotFound(String),

    /// The tenant slug is unknown or missing (strict mode).
    #[error("unknown or missing tenant slug '{0}'")]
    UnknownTenant(String),

    /// Per-principal or per-IP rate limit exceeded.
    #[error("rate limit exceeded")]
    RateLimited {
        /// Seconds until the caller can retry.
        retry_after: u64,
    },

    /// The upstream connection failed.
    #[error("upstream connect failed: {0}")]
    UpstreamConnect(String),

    /// The upstream call exceeded its deadline.
    #[error("upstream timed out after {0} s")]
    UpstreamTimeout(u64),

    /// Anything else; full detail is logged, the client sees a generic
    /// message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RouteNotFound(_) | Self::UnknownTenant(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamConnect(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the envelope.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            Self::UnknownTenant(_) => "UNKNOWN_TENANT",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::UpstreamConnect(_) => "BAD_GATEWAY",
            Self::UpstreamTimeout(_) => "GATEWAY_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to the client. Internal details never leak.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_owned(),
            other => other.to_string(),
        }
    }

    /// Render the JSON error envelope:
    ///
    /// ```json
    /// {"error":{"status":403,"code":"FORBIDDEN","message":"...",
    ///   "timestamp":"...","path":"...","correlationId":"..."}}
    /// ```
    ///
    /// Rate-limited responses also carry `Retry-After`.
    #[must_use]
    pub fn into_envelope(self, path: &str, correlation_id: &str) -> Response<Body> {
        let status = self.status();
        let body = serde_json::json!({
            "error": {
                "status": status.as_u16(),
                "code": self.code(),
                "message": self.public_message(),
                "timestamp": Utc::now().to_rfc3339(),
                "path": path,
                "correlationId": correlation_id,
            }
        });

        let mut builder = Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json");

        if let Self::RateLimited { retry_after } = &self {
            builder = builder.header(header::RETRY_AFTER, *retry_after);
        }

        builder
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| Response::new(Body::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_and_codes() {
        assert_eq!(
            GatewayError::Unauthorized("no token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::RouteNotFound("/x".into()).code(),
            "ROUTE_NOT_FOUND"
        );
        assert_eq!(
            GatewayError::RateLimited { retry_after: 30 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(GatewayError::UpstreamTimeout(30).status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn internal_detail_does_not_leak() {
        let err = GatewayError::Internal("db password is hunter2".into());
        assert_eq!(err.public_message(), "internal server error");
    }

    #[tokio::test]
    async fn envelope_shape() {
        let resp = GatewayError::Forbidden("role mismatch".into())
            .into_envelope("/tenant-a/api/users", "corr-1");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["status"], 403);
        assert_eq!(json["error"]["code"], "FORBIDDEN");
        assert_eq!(json["error"]["path"], "/tenant-a/api/users");
        assert_eq!(json["error"]["correlationId"], "corr-1");
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let resp =
            GatewayError::RateLimited { retry_after: 42 }.into_envelope("/api/orders", "corr-2");
        assert_eq!(resp.headers()[header::RETRY_AFTER], "42");
    }
}
