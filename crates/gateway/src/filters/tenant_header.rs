use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use portico_core::TenantContext;

use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::pipeline::{Filter, FilterAction};
use crate::tenant_cache::TenantSlugCache;

/// Resolves tenant context from the `X-Tenant-Slug` request header when
/// the URL did not carry a slug segment.
///
/// The header is advisory: an unresolvable value is ignored rather than
/// rejected, since route authorization still gates the request.
pub struct TenantHeaderFilter {
    tenants: Arc<TenantSlugCache>,
}

impl TenantHeaderFilter {
    #[must_use]
    pub fn new(tenants: Arc<TenantSlugCache>) -> Self {
        Self { tenants }
    }
}

#[async_trait]
impl Filter for TenantHeaderFilter {
    fn name(&self) -> &'static str {
        "tenant-header"
    }

    fn order(&self) -> i32 {
        super::ORDER_TENANT_HEADER
    }

    async fn pre(&self, exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
        if exchange.tenant.is_some() {
            return Ok(FilterAction::Continue);
        }

        let Some(slug) = exchange
            .headers
            .get("x-tenant-slug")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        else {
            return Ok(FilterAction::Continue);
        };

        match self.tenants.resolve(slug) {
            Some(tenant_id) => {
                exchange.tenant = Some(TenantContext::new(tenant_id, slug));
            }
            None => {
                debug!(slug = %slug, "ignoring unresolvable X-Tenant-Slug header");
            }
        }

        Ok(FilterAction::Continue)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;

    use super::*;

    #[tokio::test]
    async fn resolves_header_when_no_slug_in_path() {
        let tenants = Arc::new(TenantSlugCache::new());
        tenants.upsert("tenant-a", "t1");
        let filter = TenantHeaderFilter::new(tenants);

        let req = Request::builder()
            .uri("/api/users")
            .header("X-Tenant-Slug", "tenant-a")
            .body(Body::empty())
            .unwrap();
        let mut ex = Exchange::from_request(req, None);

        filter.pre(&mut ex).await.unwrap();
        assert_eq!(ex.tenant.unwrap().id, "t1");
    }

    #[tokio::test]
    async fn path_slug_takes_precedence() {
        let tenants = Arc::new(TenantSlugCache::new());
        tenants.upsert("tenant-b", "t2");
        let filter = TenantHeaderFilter::new(tenants);

        let req = Request::builder()
            .uri("/api/users")
            .header("X-Tenant-Slug", "tenant-b")
            .body(Body::empty())
            .unwrap();
        let mut ex = Exchange::from_request(req, None);
        ex.tenant = Some(TenantContext::new("t1", "tenant-a"));

        filter.pre(&mut ex).await.unwrap();
        assert_eq!(ex.tenant.unwrap().id, "t1");
    }
}
