use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderValue, Response};

use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::metrics::GatewayMetrics;
use crate::pipeline::{Filter, FilterAction};
use crate::ratelimit::{RateLimitDecision, RateLimiter};

/// Per-`(route, principal)` rate limiting over the shared cache.
///
/// Anonymous traffic is not counted here; the IP limiter owns the
/// unauthenticated paths. When the cache is down the check degrades to
/// allow and no `X-RateLimit-*` headers are attached.
pub struct RateLimitFilter {
    limiter: Arc<RateLimiter>,
    metrics: Arc<GatewayMetrics>,
}

impl RateLimitFilter {
    #[must_use]
    pub fn new(limiter: Arc<RateLimiter>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { limiter, metrics }
    }
}

#[async_trait]
impl Filter for RateLimitFilter {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    fn order(&self) -> i32 {
        super::ORDER_RATE_LIMIT
    }

    async fn pre(&self, exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
        let (Some(route), Some(principal_id)) = (
            exchange.route.clone(),
            exchange.principal_id().map(str::to_owned),
        ) else {
            return Ok(FilterAction::Continue);
        };

        match self.limiter.check(&route, &principal_id).await {
            RateLimitDecision::Permitted(headers) => {
                exchange.rate_limit = Some(headers);
                Ok(FilterAction::Continue)
            }
            RateLimitDecision::Limited { retry_after_secs } => Ok(FilterAction::ShortCircuit(
                GatewayError::RateLimited {
                    retry_after: retry_after_secs,
                }
                .into_envelope(&exchange.original_path, &exchange.correlation_id),
            )),
            RateLimitDecision::Degraded => {
                self.metrics.increment_rate_limit_degraded();
                Ok(FilterAction::Continue)
            }
            RateLimitDecision::Unlimited => Ok(FilterAction::Continue),
        }
    }

    /// Attach the `X-RateLimit-*` headers recorded during the pre phase.
    async fn post(
        &self,
        exchange: &mut Exchange,
        mut response: Response<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        if let Some(rl) = exchange.rate_limit {
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(rl.limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(rl.remaining));
            headers.insert("x-ratelimit-reset", HeaderValue::from(rl.reset_epoch));
        }
        Ok(response)
    }
}
