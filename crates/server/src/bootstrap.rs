use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use portico_core::{BootstrapDocument, BootstrapTenant};
use portico_gateway::{AuthzCache, RouteRegistry, TenantSlugCache};

use crate::config::ControlPlaneConfig;
use crate::error::ServerError;

/// Client for the control plane's bootstrap surface.
///
/// One `fetch` at startup is mandatory and fatal on failure; afterwards
/// the control plane may be unreachable without affecting routing, and
/// this client is only used for slug refreshes and health probes.
pub struct BootstrapClient {
    client: reqwest::Client,
    config: ControlPlaneConfig,
}

impl BootstrapClient {
    pub fn new(config: ControlPlaneConfig) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServerError::Config(format!("failed to build bootstrap client: {e}")))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    /// Fetch the full initial configuration.
    pub async fn fetch(&self) -> Result<BootstrapDocument, ServerError> {
        let url = self.url(&self.config.bootstrap_path);
        let doc = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServerError::Bootstrap(format!("GET {url}: {e}")))?
            .error_for_status()
            .map_err(|e| ServerError::Bootstrap(format!("GET {url}: {e}")))?
            .json::<BootstrapDocument>()
            .await
            .map_err(|e| ServerError::Bootstrap(format!("invalid bootstrap document: {e}")))?;

        info!(
            services = doc.services.len(),
            collections = doc.collections.len(),
            authz = doc.authorization.collections.len(),
            tenants = doc.tenants.len(),
            "bootstrap document fetched"
        );
        Ok(doc)
    }

    /// Fetch the tenant slug map (refresh path).
    pub async fn fetch_slug_map(&self) -> Result<Vec<BootstrapTenant>, ServerError> {
        let url = self.url(&self.config.slug_map_path);
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServerError::Bootstrap(format!("GET {url}: {e}")))?
            .error_for_status()
            .map_err(|e| ServerError::Bootstrap(format!("GET {url}: {e}")))?
            .json::<Vec<BootstrapTenant>>()
            .await
            .map_err(|e| ServerError::Bootstrap(format!("invalid slug map: {e}")))
    }

    /// Liveness probe for the health endpoint.
    pub async fn ping(&self) -> bool {
        let url = self.url(&self.config.bootstrap_path);
        matches!(
            self.client.head(&url).send().await.map(|r| r.status()),
            Ok(status) if !status.is_server_error()
        )
    }
}

/// Load the bootstrap document into the registry and caches. Replaces any
/// previous content wholesale, so it also serves as the full-refresh path.
pub fn apply(
    doc: &BootstrapDocument,
    registry: &Arc<RouteRegistry>,
    authz: &Arc<AuthzCache>,
    tenants: &Arc<TenantSlugCache>,
) {
    let (routes, orphaned) = doc.routes();
    for collection in orphaned {
        warn!(
            collection_id = %collection.id,
            service_id = %collection.service_id,
            "collection references unknown service, skipping route"
        );
    }

    registry.clear();
    let mut loaded = 0usize;
    for route in routes {
        match registry.add(route) {
            Ok(()) => loaded += 1,
            Err(e) => warn!(error = %e, "bootstrap route rejected"),
        }
    }

    authz.load(doc.authorization.collections.iter().cloned());
    tenants.replace_all(
        doc.tenants
            .iter()
            .map(|t| (t.slug.clone(), t.id.clone())),
    );

    info!(
        routes = loaded,
        authz = doc.authorization.collections.len(),
        tenants = doc.tenants.len(),
        "bootstrap configuration applied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_loads_registry_and_caches() {
        let doc: BootstrapDocument = serde_json::from_value(serde_json::json!({
            "services": [{"id": "svc-users", "baseUrl": "http://users:8080"}],
            "collections": [
                {"id": "col-users", "name": "users", "path": "/api/users/**", "serviceId": "svc-users"}
            ],
            "authorization": {
                "collections": [
                    {"collectionId": "users",
                     "routePolicies": [{"method": "GET", "requiredRoles": ["viewer"]}]}
                ]
            },
            "tenants": [{"id": "t1", "slug": "tenant-a"}]
        }))
        .unwrap();

        let registry = Arc::new(RouteRegistry::new());
        let authz = Arc::new(AuthzCache::new());
        let tenants = Arc::new(TenantSlugCache::new());

        apply(&doc, &registry, &authz, &tenants);

        assert!(registry.find_by_path("/api/users/42").is_some());
        assert!(authz.get("users").is_some());
        assert_eq!(tenants.resolve("tenant-a").as_deref(), Some("t1"));
    }

    #[test]
    fn apply_replaces_previous_state() {
        let registry = Arc::new(RouteRegistry::new());
        let authz = Arc::new(AuthzCache::new());
        let tenants = Arc::new(TenantSlugCache::new());
        tenants.upsert("stale", "t0");

        apply(&BootstrapDocument::default(), &registry, &authz, &tenants);

        assert!(registry.is_empty());
        assert!(tenants.resolve("stale").is_none());
    }
}
