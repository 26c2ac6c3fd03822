use std::time::Duration;

use serde::Deserialize;

use portico_gateway::UpstreamConfig;

/// What happens to the client `Authorization` header before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationHeaderMode {
    /// Backends trust the gateway's `X-Forwarded-*` identity.
    #[default]
    Strip,
    /// Backends re-validate the token themselves.
    Preserve,
}

/// Upstream forwarding settings.
#[derive(Debug, Deserialize)]
pub struct UpstreamTomlConfig {
    /// Overall per-request deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// TCP connect deadline in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Bounded connection pool per backend host.
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// `Authorization` header policy.
    #[serde(default)]
    pub authorization_header: AuthorizationHeaderMode,

    /// Largest response body the JSON:API transformer will buffer, in
    /// bytes. Larger responses pass through untransformed.
    #[serde(default = "default_response_size_limit")]
    pub response_size_limit: usize,
}

impl Default for UpstreamTomlConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            pool_max_idle_per_host: default_pool_max_idle(),
            authorization_header: AuthorizationHeaderMode::default(),
            response_size_limit: default_response_size_limit(),
        }
    }
}

impl UpstreamTomlConfig {
    /// Project onto the upstream client's configuration.
    #[must_use]
    pub fn client_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            timeout: Duration::from_secs(self.timeout_seconds),
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            pool_max_idle_per_host: self.pool_max_idle_per_host,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_pool_max_idle() -> usize {
    32
}

fn default_response_size_limit() -> usize {
    4 << 20
}
