//! The Portico traffic plane.
//!
//! One exchange flows through a precedence-ordered filter pipeline: tenant
//! slug extraction, IP limiting, JWT authentication, route matching,
//! per-principal rate limiting, route authorization, header rewriting,
//! then the upstream call and response post-processing (security headers,
//! JSON:API field filtering and include resolution, access logging).
//!
//! Shared state (route registry, authz cache, tenant slugs) is read-mostly:
//! request handlers take short read locks, the configuration path takes the
//! write lock. Rate-limit counters live in the shared cache and degrade
//! fail-open when it is unreachable.

pub mod authz_cache;
pub mod error;
pub mod events;
pub mod exchange;
pub mod filters;
pub mod gateway;
pub mod include;
pub mod ip_limit;
pub mod metrics;
pub mod oidc;
pub mod pipeline;
pub mod proxy;
pub mod ratelimit;
pub mod registry;
pub mod tenant_cache;
pub mod transform;

pub use authz_cache::AuthzCache;
pub use error::GatewayError;
pub use events::ConfigEventApplier;
pub use exchange::Exchange;
pub use filters::PublicPaths;
pub use filters::forward_headers::AuthorizationHeaderPolicy;
pub use filters::tenant_slug::TenantSlugConfig;
pub use gateway::{GatewayConfig, GatewayCore, GatewayServices};
pub use include::IncludeResolver;
pub use ip_limit::IpRateLimiter;
pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use oidc::{AuthError, JwksVerifier, StaticTokenVerifier, TokenVerifier};
pub use pipeline::{Filter, FilterAction, Pipeline};
pub use proxy::{UpstreamClient, UpstreamConfig};
pub use ratelimit::{RateLimitDecision, RateLimiter};
pub use registry::RouteRegistry;
pub use tenant_cache::TenantSlugCache;
