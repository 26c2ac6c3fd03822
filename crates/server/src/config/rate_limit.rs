use serde::Deserialize;

use portico_core::RateLimitPolicy;

/// Rate limiting configuration.
#[derive(Debug, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the default per-principal limit applies to routes without
    /// their own. Per-route limits always apply.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Default budget for routes without an explicit limit.
    #[serde(default = "default_requests")]
    pub requests_per_window: u64,

    /// Default window in seconds.
    #[serde(default = "default_window")]
    pub window_seconds: u64,

    /// Per-IP budget on unauthenticated paths.
    #[serde(default = "default_ip_requests")]
    pub ip_requests_per_window: usize,

    /// Per-IP sliding window in seconds.
    #[serde(default = "default_ip_window")]
    pub ip_window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            requests_per_window: default_requests(),
            window_seconds: default_window(),
            ip_requests_per_window: default_ip_requests(),
            ip_window_seconds: default_ip_window(),
        }
    }
}

impl RateLimitConfig {
    /// The default policy, or `None` when disabled.
    #[must_use]
    pub fn default_policy(&self) -> Option<RateLimitPolicy> {
        self.enabled.then_some(RateLimitPolicy {
            requests_per_window: self.requests_per_window,
            window_seconds: self.window_seconds,
        })
    }
}

fn default_enabled() -> bool {
    true
}

fn default_requests() -> u64 {
    1000
}

fn default_window() -> u64 {
    60
}

fn default_ip_requests() -> usize {
    100
}

fn default_ip_window() -> u64 {
    60
}
