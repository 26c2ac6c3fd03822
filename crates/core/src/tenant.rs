use serde::{Deserialize, Serialize};

/// Tenant identity resolved from the URL slug, carried on the exchange and
/// forwarded to backends as `X-Tenant-ID` / `X-Tenant-Slug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// Stable tenant identifier.
    pub id: String,
    /// URL slug the request arrived under.
    pub slug: String,
}

impl TenantContext {
    #[must_use]
    pub fn new(id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
        }
    }
}
