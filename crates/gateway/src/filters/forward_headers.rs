use async_trait::async_trait;
use axum::http::{HeaderValue, header};

use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::pipeline::{Filter, FilterAction};

/// What happens to the client `Authorization` header before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationHeaderPolicy {
    /// Remove it; backends trust the gateway's `X-Forwarded-*` identity.
    #[default]
    Strip,
    /// Pass it through; backends re-validate the token themselves.
    Preserve,
}

/// Rewrites request headers before the upstream call.
///
/// Adds `X-Forwarded-User` and `X-Forwarded-Roles` for the authenticated
/// principal, and `X-Tenant-ID` / `X-Tenant-Slug` when tenant context was
/// resolved. All other client headers pass through unchanged.
pub struct ForwardHeadersFilter {
    authorization: AuthorizationHeaderPolicy,
}

impl ForwardHeadersFilter {
    #[must_use]
    pub fn new(authorization: AuthorizationHeaderPolicy) -> Self {
        Self { authorization }
    }
}

#[async_trait]
impl Filter for ForwardHeadersFilter {
    fn name(&self) -> &'static str {
        "forward-headers"
    }

    fn order(&self) -> i32 {
        super::ORDER_FORWARD_HEADERS
    }

    async fn pre(&self, exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
        if self.authorization == AuthorizationHeaderPolicy::Strip {
            exchange.headers.remove(header::AUTHORIZATION);
        }

        // Never trust client-supplied identity headers.
        exchange.headers.remove("x-forwarded-user");
        exchange.headers.remove("x-forwarded-roles");
        exchange.headers.remove("x-tenant-id");
        exchange.headers.remove("x-tenant-slug");

        if let Some(principal) = &exchange.principal {
            if let Ok(value) = HeaderValue::from_str(&principal.username) {
                exchange.headers.insert("x-forwarded-user", value);
            }
            if let Ok(value) = HeaderValue::from_str(&principal.roles_header()) {
                exchange.headers.insert("x-forwarded-roles", value);
            }
        }

        if let Some(tenant) = &exchange.tenant {
            if let Ok(value) = HeaderValue::from_str(&tenant.id) {
                exchange.headers.insert("x-tenant-id", value);
            }
            if let Ok(value) = HeaderValue::from_str(&tenant.slug) {
                exchange.headers.insert("x-tenant-slug", value);
            }
        }

        if let Ok(value) = HeaderValue::from_str(&exchange.correlation_id) {
            exchange.headers.insert("x-correlation-id", value);
        }

        Ok(FilterAction::Continue)
    }
}
