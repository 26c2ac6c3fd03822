use serde::Deserialize;

/// Control plane endpoints consumed at startup and on refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlPlaneConfig {
    /// Base URL of the control plane.
    #[serde(default = "default_url")]
    pub url: String,

    /// Path of the one-shot bootstrap document.
    #[serde(default = "default_bootstrap_path")]
    pub bootstrap_path: String,

    /// Path of the tenant slug map.
    #[serde(default = "default_slug_map_path")]
    pub slug_map_path: String,

    /// Interval between periodic tenant slug refreshes, in seconds.
    #[serde(default = "default_refresh_interval")]
    pub slug_refresh_seconds: u64,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            bootstrap_path: default_bootstrap_path(),
            slug_map_path: default_slug_map_path(),
            slug_refresh_seconds: default_refresh_interval(),
        }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:9090".to_owned()
}

fn default_bootstrap_path() -> String {
    "/control/bootstrap".to_owned()
}

fn default_slug_map_path() -> String {
    "/control/tenants/slug-map".to_owned()
}

fn default_refresh_interval() -> u64 {
    300
}
