use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use portico_core::TenantContext;

use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::pipeline::{Filter, FilterAction};
use crate::tenant_cache::{TenantSlugCache, is_slug_shaped};

/// Tenant slug handling configuration.
#[derive(Debug, Clone)]
pub struct TenantSlugConfig {
    pub enabled: bool,
    /// Strict mode: an unknown slug is a 404, and tenant-scoped (`/api`)
    /// paths must carry a slug. When `false` (migration mode), unknown
    /// slugs are stripped and forwarded without tenant context.
    pub require_prefix: bool,
    /// Path prefixes that never carry a slug (health, control plane).
    pub platform_paths: Vec<String>,
}

impl Default for TenantSlugConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_prefix: true,
            platform_paths: vec!["/control".to_owned(), "/actuator".to_owned()],
        }
    }
}

/// Extracts the leading tenant slug segment, resolves it against the slug
/// cache, and rewrites the exchange path to the bare form used for route
/// matching.
pub struct TenantSlugFilter {
    config: TenantSlugConfig,
    tenants: Arc<TenantSlugCache>,
}

impl TenantSlugFilter {
    #[must_use]
    pub fn new(config: TenantSlugConfig, tenants: Arc<TenantSlugCache>) -> Self {
        Self { config, tenants }
    }

    fn is_platform_path(&self, path: &str) -> bool {
        self.config
            .platform_paths
            .iter()
            .any(|prefix| path == prefix || path.starts_with(&format!("{prefix}/")))
    }
}

#[async_trait]
impl Filter for TenantSlugFilter {
    fn name(&self) -> &'static str {
        "tenant-slug"
    }

    fn order(&self) -> i32 {
        super::ORDER_TENANT_SLUG
    }

    async fn pre(&self, exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
        if !self.config.enabled || self.is_platform_path(&exchange.path) {
            return Ok(FilterAction::Continue);
        }

        let (first, rest) = split_first_segment(&exchange.path);

        // A tenant-scoped URL is `/{slug}/api/...`; a bare `/api/...` has
        // no slug to extract.
        let carries_slug = !rest.is_empty() && rest != "/" && is_api_path(rest);
        if !carries_slug {
            if is_api_path(&exchange.path) && self.config.require_prefix {
                return Ok(FilterAction::ShortCircuit(
                    GatewayError::UnknownTenant(String::new())
                        .into_envelope(&exchange.original_path, &exchange.correlation_id),
                ));
            }
            return Ok(FilterAction::Continue);
        }

        if !is_slug_shaped(first) {
            return Ok(FilterAction::Continue);
        }

        match self.tenants.resolve(first) {
            Some(tenant_id) => {
                exchange.tenant = Some(TenantContext::new(tenant_id, first));
                exchange.path = rest.to_owned();
            }
            None if self.config.require_prefix => {
                debug!(slug = %first, "rejecting unknown tenant slug");
                return Ok(FilterAction::ShortCircuit(
                    GatewayError::UnknownTenant(first.to_owned())
                        .into_envelope(&exchange.original_path, &exchange.correlation_id),
                ));
            }
            None => {
                // Migration mode: strip and forward without tenant context.
                debug!(slug = %first, "stripping unresolved tenant slug");
                exchange.path = rest.to_owned();
            }
        }

        Ok(FilterAction::Continue)
    }
}

/// Split `/seg/rest...` into (`seg`, `/rest...`).
fn split_first_segment(path: &str) -> (&str, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.find('/') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
        None => (trimmed, ""),
    }
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}
