use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use tracing::{error, info, warn};

use portico_core::RateLimitPolicy;
use portico_state::CacheStore;

use crate::authz_cache::AuthzCache;
use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::filters::forward_headers::{AuthorizationHeaderPolicy, ForwardHeadersFilter};
use crate::filters::tenant_slug::{TenantSlugConfig, TenantSlugFilter};
use crate::filters::{
    PublicPaths, access_log::AccessLogFilter, auth::AuthFilter, authorize::AuthorizeFilter,
    ip_limit::IpLimitFilter, rate_limit::RateLimitFilter, route_match::RouteMatchFilter,
    security_headers, security_headers::SecurityHeadersFilter, tenant_header::TenantHeaderFilter,
    transform::TransformFilter,
};
use crate::include::IncludeResolver;
use crate::ip_limit::IpRateLimiter;
use crate::metrics::GatewayMetrics;
use crate::oidc::TokenVerifier;
use crate::pipeline::Pipeline;
use crate::proxy::{UpstreamClient, UpstreamConfig};
use crate::ratelimit::RateLimiter;
use crate::registry::RouteRegistry;
use crate::tenant_cache::TenantSlugCache;

/// The process-wide services the traffic plane runs on. Constructed once
/// at startup and shared by every exchange.
#[derive(Clone)]
pub struct GatewayServices {
    pub registry: Arc<RouteRegistry>,
    pub authz: Arc<AuthzCache>,
    pub tenants: Arc<TenantSlugCache>,
    pub store: Arc<dyn CacheStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub metrics: Arc<GatewayMetrics>,
}

/// Tunables for the traffic plane.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub tenant: TenantSlugConfig,
    pub public_paths: PublicPaths,
    /// Per-IP budget on unauthenticated paths.
    pub ip_limit: usize,
    pub ip_window: Duration,
    /// Fallback for routes without their own limit. `None` disables
    /// default limiting.
    pub default_rate_limit: Option<RateLimitPolicy>,
    pub authorization_header: AuthorizationHeaderPolicy,
    /// Largest response body the JSON:API transformer will buffer.
    pub response_size_limit: usize,
    pub upstream: UpstreamConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            tenant: TenantSlugConfig::default(),
            public_paths: PublicPaths::default(),
            ip_limit: 100,
            ip_window: Duration::from_secs(60),
            default_rate_limit: None,
            authorization_header: AuthorizationHeaderPolicy::default(),
            response_size_limit: 4 << 20,
            upstream: UpstreamConfig::default(),
        }
    }
}

/// Glues the pipeline to the registry and the upstream client.
///
/// For each exchange: build the context, run the pre filters, forward to
/// the matched backend, run the post filters, commit. Errors anywhere in
/// the pipeline surface as the JSON error envelope; upstream responses
/// (any status) pass through. Cancellation is structural: when the client
/// disconnects, the exchange future is dropped and every suspended
/// operation (cache lookup, upstream call) is cancelled with it.
pub struct GatewayCore {
    pipeline: Pipeline,
    upstream: UpstreamClient,
    metrics: Arc<GatewayMetrics>,
    ip_limiter: Arc<IpRateLimiter>,
}

impl GatewayCore {
    /// Assemble the filter chain in its canonical order.
    pub fn new(services: &GatewayServices, config: GatewayConfig) -> Result<Self, GatewayError> {
        let ip_limiter = Arc::new(IpRateLimiter::new(config.ip_limit, config.ip_window));
        let limiter = Arc::new(RateLimiter::new(
            Arc::clone(&services.store),
            config.default_rate_limit,
        ));
        let resolver = IncludeResolver::new(Arc::clone(&services.store));

        let pipeline = Pipeline::new(vec![
            Arc::new(TenantSlugFilter::new(
                config.tenant.clone(),
                Arc::clone(&services.tenants),
            )),
            Arc::new(TenantHeaderFilter::new(Arc::clone(&services.tenants))),
            Arc::new(IpLimitFilter::new(
                Arc::clone(&ip_limiter),
                config.public_paths.clone(),
            )),
            Arc::new(AuthFilter::new(
                Arc::clone(&services.verifier),
                config.public_paths.clone(),
            )),
            Arc::new(RouteMatchFilter::new(Arc::clone(&services.registry))),
            Arc::new(RateLimitFilter::new(limiter, Arc::clone(&services.metrics))),
            Arc::new(AuthorizeFilter::new(Arc::clone(&services.authz))),
            Arc::new(ForwardHeadersFilter::new(config.authorization_header)),
            Arc::new(SecurityHeadersFilter),
            Arc::new(TransformFilter::new(
                Arc::clone(&services.authz),
                resolver,
                Arc::clone(&services.metrics),
                config.response_size_limit,
            )),
            Arc::new(AccessLogFilter),
        ]);

        let upstream = UpstreamClient::new(&config.upstream)?;

        info!(filters = ?pipeline.filter_names(), "gateway pipeline assembled");

        Ok(Self {
            pipeline,
            upstream,
            metrics: Arc::clone(&services.metrics),
            ip_limiter,
        })
    }

    /// The IP limiter, for wiring its background eviction task.
    #[must_use]
    pub fn ip_limiter(&self) -> Arc<IpRateLimiter> {
        Arc::clone(&self.ip_limiter)
    }

    /// Handle one exchange end to end.
    pub async fn handle(&self, request: Request<Body>, client_ip: Option<IpAddr>) -> Response<Body> {
        self.metrics.increment_requests();
        let mut exchange = Exchange::from_request(request, client_ip);
        let response = self.process(&mut exchange).await;
        self.tally(response.status());
        response
    }

    async fn process(&self, exchange: &mut Exchange) -> Response<Body> {
        let response = match self.pipeline.run_pre(exchange).await {
            Ok(Some(short_circuit)) => short_circuit,
            Ok(None) => match self.upstream.forward(exchange).await {
                Ok(response) => {
                    self.metrics.increment_forwarded();
                    response
                }
                Err(e) => {
                    self.metrics.increment_upstream_errors();
                    warn!(
                        path = %exchange.original_path,
                        correlation_id = %exchange.correlation_id,
                        error = %e,
                        "upstream call failed"
                    );
                    e.into_envelope(&exchange.original_path, &exchange.correlation_id)
                }
            },
            Err(e) => {
                error!(
                    path = %exchange.original_path,
                    correlation_id = %exchange.correlation_id,
                    error = %e,
                    "pipeline error"
                );
                e.into_envelope(&exchange.original_path, &exchange.correlation_id)
            }
        };

        match self.pipeline.run_post(exchange, response).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    path = %exchange.original_path,
                    correlation_id = %exchange.correlation_id,
                    error = %e,
                    "post-processing error"
                );
                let mut response =
                    e.into_envelope(&exchange.original_path, &exchange.correlation_id);
                // The post chain may have aborted before the security
                // filter ran.
                security_headers::apply(response.headers_mut());
                response
            }
        }
    }

    fn tally(&self, status: StatusCode) {
        match status {
            StatusCode::UNAUTHORIZED => self.metrics.increment_unauthorized(),
            StatusCode::FORBIDDEN => self.metrics.increment_forbidden(),
            StatusCode::NOT_FOUND => self.metrics.increment_not_found(),
            StatusCode::TOO_MANY_REQUESTS => self.metrics.increment_rate_limited(),
            _ => {}
        }
    }
}
