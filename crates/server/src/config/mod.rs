mod cache;
mod control_plane;
mod jwt;
mod rate_limit;
mod server;
mod tenant;
mod upstream;

#[cfg(test)]
mod tests;

pub use cache::*;
pub use control_plane::*;
pub use jwt::*;
pub use rate_limit::*;
pub use server::*;
pub use tenant::*;
pub use upstream::*;

use serde::Deserialize;

use portico_bus::BusConfig;
use portico_gateway::{
    AuthorizationHeaderPolicy, GatewayConfig, PublicPaths, TenantSlugConfig,
};

/// Top-level configuration for the Portico server, loaded from a TOML
/// file.
#[derive(Debug, Default, Deserialize)]
pub struct PorticoConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Control plane endpoints (bootstrap, slug map).
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,

    /// Configuration bus (Kafka) settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// Shared cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// JWT validation settings.
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Per-principal rate limiting defaults.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Tenant slug handling.
    #[serde(default)]
    pub tenant: TenantConfig,

    /// Upstream forwarding settings.
    #[serde(default)]
    pub upstream: UpstreamTomlConfig,
}

impl PorticoConfig {
    /// Project the TOML settings onto the gateway's runtime configuration.
    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            tenant: TenantSlugConfig {
                enabled: self.tenant.enabled,
                require_prefix: self.tenant.require_prefix,
                platform_paths: self.tenant.platform_paths.clone(),
            },
            public_paths: PublicPaths::new(self.jwt.unauthenticated_paths.clone()),
            ip_limit: self.rate_limit.ip_requests_per_window,
            ip_window: std::time::Duration::from_secs(self.rate_limit.ip_window_seconds),
            default_rate_limit: self.rate_limit.default_policy(),
            authorization_header: match self.upstream.authorization_header {
                AuthorizationHeaderMode::Strip => AuthorizationHeaderPolicy::Strip,
                AuthorizationHeaderMode::Preserve => AuthorizationHeaderPolicy::Preserve,
            },
            response_size_limit: self.upstream.response_size_limit,
            upstream: self.upstream.client_config(),
        }
    }
}
