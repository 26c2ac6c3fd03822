use serde::Deserialize;

/// Tenant slug handling.
#[derive(Debug, Deserialize)]
pub struct TenantConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Strict mode: unknown slugs are rejected and `/api` paths must carry
    /// one. Disable during migration to strip-and-forward instead.
    #[serde(default = "default_require_prefix")]
    pub require_prefix: bool,

    /// Path prefixes that never carry a slug.
    #[serde(default = "default_platform_paths")]
    pub platform_paths: Vec<String>,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            require_prefix: default_require_prefix(),
            platform_paths: default_platform_paths(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_require_prefix() -> bool {
    true
}

fn default_platform_paths() -> Vec<String> {
    vec!["/control".to_owned(), "/actuator".to_owned()]
}
