use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use tracing::info;

use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::pipeline::Filter;

/// Request logging, last in the chain so it observes the final status.
pub struct AccessLogFilter;

#[async_trait]
impl Filter for AccessLogFilter {
    fn name(&self) -> &'static str {
        "access-log"
    }

    fn order(&self) -> i32 {
        super::ORDER_ACCESS_LOG
    }

    async fn post(
        &self,
        exchange: &mut Exchange,
        response: Response<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        let latency_ms = exchange.received_at.elapsed().as_millis();
        info!(
            method = %exchange.method,
            path = %exchange.original_path,
            status = response.status().as_u16(),
            latency_ms,
            principal = exchange.principal_id().unwrap_or("-"),
            tenant = exchange.tenant.as_ref().map_or("-", |t| t.id.as_str()),
            route_id = exchange.route.as_ref().map_or("-", |r| r.id.as_str()),
            correlation_id = %exchange.correlation_id,
            upstream = exchange.upstream_called,
            "request completed"
        );
        Ok(response)
    }
}
