use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use portico_core::{RateLimitPolicy, RouteDefinition};
use portico_state::{CacheStore, rate_limit_key};

use crate::exchange::RateLimitHeaders;

/// Outcome of a per-principal rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Within budget; headers to attach to the response.
    Permitted(RateLimitHeaders),
    /// Over budget.
    Limited { retry_after_secs: u64 },
    /// The cache was unreachable or slow; the request is allowed and no
    /// headers are attached. Availability over exactness.
    Degraded,
    /// Neither the route nor the gateway default carries a limit.
    Unlimited,
}

/// Counter-based distributed rate limiter over the shared cache.
///
/// One atomic increment per request on `ratelimit:{routeId}:{principal}`.
/// The first request in a window sets the TTL; the counter expiring resets
/// the window. The single source of truth is the cache; no local counting.
pub struct RateLimiter {
    store: Arc<dyn CacheStore>,
    default_policy: Option<RateLimitPolicy>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, default_policy: Option<RateLimitPolicy>) -> Self {
        Self {
            store,
            default_policy,
        }
    }

    /// Count this request against the `(route, principal)` budget.
    pub async fn check(&self, route: &RouteDefinition, principal_id: &str) -> RateLimitDecision {
        let Some(policy) = route.rate_limit.or(self.default_policy) else {
            return RateLimitDecision::Unlimited;
        };

        let key = rate_limit_key(&route.id, principal_id);
        let window = policy.window();

        let count = match self.store.increment(&key, 1, Some(window)).await {
            Ok(count) => u64::try_from(count).unwrap_or(0),
            Err(e) => {
                warn!(
                    route_id = %route.id,
                    error = %e,
                    "rate-limit counter unavailable, allowing request"
                );
                return RateLimitDecision::Degraded;
            }
        };

        let remaining_ttl = if count == 1 {
            window
        } else {
            self.remaining_ttl(&key, window).await
        };

        if count > policy.requests_per_window {
            let retry_after_secs = remaining_ttl
                .as_secs()
                .max(1)
                .min(policy.window_seconds.max(1));
            RateLimitDecision::Limited { retry_after_secs }
        } else {
            let reset_epoch = Utc::now().timestamp() + i64::try_from(remaining_ttl.as_secs()).unwrap_or(0);
            RateLimitDecision::Permitted(RateLimitHeaders {
                limit: policy.requests_per_window,
                remaining: policy.requests_per_window - count,
                reset_epoch,
            })
        }
    }

    /// Remaining window, falling back to the full window when the TTL
    /// lookup fails. The counter itself already succeeded, so a TTL hiccup
    /// only skews the advertised reset time.
    async fn remaining_ttl(&self, key: &str, window: Duration) -> Duration {
        match self.store.ttl(key).await {
            Ok(Some(ttl)) => ttl,
            Ok(None) => window,
            Err(e) => {
                debug!(error = %e, "rate-limit ttl lookup failed");
                window
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use portico_state::testing::FailingStore;
    use portico_state_memory::MemoryCacheStore;

    use super::*;

    fn route(limit: u64, window_seconds: u64) -> RouteDefinition {
        RouteDefinition {
            id: "col-orders".into(),
            path: "/api/orders/**".into(),
            backend_url: "http://orders:8080".into(),
            collection: "orders".into(),
            service_id: None,
            rate_limit: Some(RateLimitPolicy {
                requests_per_window: limit,
                window_seconds,
            }),
        }
    }

    #[tokio::test]
    async fn remaining_counts_down_then_limits() {
        let limiter = RateLimiter::new(Arc::new(MemoryCacheStore::new()), None);
        let r = route(3, 60);

        for expected_remaining in [2, 1, 0] {
            match limiter.check(&r, "u1").await {
                RateLimitDecision::Permitted(headers) => {
                    assert_eq!(headers.limit, 3);
                    assert_eq!(headers.remaining, expected_remaining);
                }
                other => panic!("expected permit, got {other:?}"),
            }
        }

        match limiter.check(&r, "u1").await {
            RateLimitDecision::Limited { retry_after_secs } => {
                assert!(retry_after_secs >= 1 && retry_after_secs <= 60);
            }
            other => panic!("expected limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn principals_have_independent_budgets() {
        let limiter = RateLimiter::new(Arc::new(MemoryCacheStore::new()), None);
        let r = route(1, 60);

        assert!(matches!(
            limiter.check(&r, "u1").await,
            RateLimitDecision::Permitted(_)
        ));
        assert!(matches!(
            limiter.check(&r, "u2").await,
            RateLimitDecision::Permitted(_)
        ));
        assert!(matches!(
            limiter.check(&r, "u1").await,
            RateLimitDecision::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn cache_failure_fails_open() {
        let limiter = RateLimiter::new(Arc::new(FailingStore), None);
        let r = route(1, 60);

        for _ in 0..5 {
            assert_eq!(limiter.check(&r, "u1").await, RateLimitDecision::Degraded);
        }
    }

    #[tokio::test]
    async fn default_policy_applies_when_route_has_none() {
        let limiter = RateLimiter::new(
            Arc::new(MemoryCacheStore::new()),
            Some(RateLimitPolicy {
                requests_per_window: 1,
                window_seconds: 60,
            }),
        );
        let mut r = route(0, 0);
        r.rate_limit = None;

        assert!(matches!(
            limiter.check(&r, "u1").await,
            RateLimitDecision::Permitted(_)
        ));
        assert!(matches!(
            limiter.check(&r, "u1").await,
            RateLimitDecision::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn no_policy_means_unlimited() {
        let limiter = RateLimiter::new(Arc::new(MemoryCacheStore::new()), None);
        let mut r = route(0, 0);
        r.rate_limit = None;

        assert_eq!(limiter.check(&r, "u1").await, RateLimitDecision::Unlimited);
    }
}
