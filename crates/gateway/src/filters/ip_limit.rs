use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::ip_limit::{IpDecision, IpRateLimiter};
use crate::pipeline::{Filter, FilterAction};

use super::PublicPaths;

/// Per-IP sliding-window limiter for the unauthenticated paths.
///
/// Authenticated traffic is limited per principal by the distributed
/// limiter instead; this filter ignores it entirely.
pub struct IpLimitFilter {
    limiter: Arc<IpRateLimiter>,
    public_paths: PublicPaths,
}

impl IpLimitFilter {
    #[must_use]
    pub fn new(limiter: Arc<IpRateLimiter>, public_paths: PublicPaths) -> Self {
        Self {
            limiter,
            public_paths,
        }
    }
}

#[async_trait]
impl Filter for IpLimitFilter {
    fn name(&self) -> &'static str {
        "ip-rate-limit"
    }

    fn order(&self) -> i32 {
        super::ORDER_IP_LIMIT
    }

    async fn pre(&self, exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
        if !self.public_paths.contains(&exchange.path) {
            return Ok(FilterAction::Continue);
        }

        let Some(ip) = exchange.client_ip else {
            // No peer address (unusual transports); nothing to key on.
            return Ok(FilterAction::Continue);
        };

        match self.limiter.check(ip) {
            IpDecision::Permitted => Ok(FilterAction::Continue),
            IpDecision::Limited { retry_after_secs } => {
                warn!(ip = %ip, path = %exchange.path, "IP rate limit exceeded");
                Ok(FilterAction::ShortCircuit(
                    GatewayError::RateLimited {
                        retry_after: retry_after_secs,
                    }
                    .into_envelope(&exchange.original_path, &exchange.correlation_id),
                ))
            }
        }
    }
}
