use serde::{Deserialize, Serialize};

use crate::authz::AuthzConfig;
use crate::route::{RateLimitPolicy, RouteDefinition};

/// A backend service known to the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapService {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub base_url: String,
}

/// A collection definition; projects to exactly one route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapCollection {
    pub id: String,
    pub name: String,
    pub path: String,
    pub service_id: String,
    #[serde(default)]
    pub rate_limit: Option<RateLimitPolicy>,
}

/// A tenant slug mapping entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapTenant {
    pub id: String,
    pub slug: String,
}

/// The authorization block: per-collection policies plus the platform role
/// vocabulary (informational; evaluation only uses the per-policy sets).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapAuthz {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub collections: Vec<AuthzConfig>,
}

/// The full initial configuration returned by `GET /control/bootstrap`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapDocument {
    #[serde(default)]
    pub services: Vec<BootstrapService>,
    #[serde(default)]
    pub collections: Vec<BootstrapCollection>,
    #[serde(default)]
    pub authorization: BootstrapAuthz,
    #[serde(default)]
    pub tenants: Vec<BootstrapTenant>,
}

impl BootstrapDocument {
    /// Project every collection to its route, joining against the service
    /// list for the backend URL.
    ///
    /// Collections referencing an unknown service are skipped; the caller
    /// logs them. Route ids are the collection ids, so later
    /// `collection.changed` events address the same entries.
    #[must_use]
    pub fn routes(&self) -> (Vec<RouteDefinition>, Vec<&BootstrapCollection>) {
        let mut routes = Vec::with_capacity(self.collections.len());
        let mut orphaned = Vec::new();

        for collection in &self.collections {
            let Some(service) = self.services.iter().find(|s| s.id == collection.service_id)
            else {
                orphaned.push(collection);
                continue;
            };

            routes.push(RouteDefinition {
                id: collection.id.clone(),
                path: collection.path.clone(),
                backend_url: service.base_url.clone(),
                collection: collection.name.clone(),
                service_id: Some(collection.service_id.clone()),
                rate_limit: collection.rate_limit,
            });
        }

        (routes, orphaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_collections_to_routes() {
        let doc: BootstrapDocument = serde_json::from_value(serde_json::json!({
            "services": [
                {"id": "svc-users", "name": "users", "baseUrl": "http://users:8080"}
            ],
            "collections": [
                {"id": "col-users", "name": "users", "path": "/api/users/**", "serviceId": "svc-users"},
                {"id": "col-lost", "name": "lost", "path": "/api/lost/**", "serviceId": "svc-gone"}
            ],
            "authorization": {
                "roles": ["admin", "viewer"],
                "collections": [
                    {"collectionId": "users", "routePolicies": [
                        {"method": "GET", "requiredRoles": ["viewer"]}
                    ]}
                ]
            },
            "tenants": [{"id": "t1", "slug": "tenant-a"}]
        }))
        .unwrap();

        let (routes, orphaned) = doc.routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].id, "col-users");
        assert_eq!(routes[0].backend_url, "http://users:8080");
        assert_eq!(routes[0].service_id.as_deref(), Some("svc-users"));
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].id, "col-lost");
        assert_eq!(doc.authorization.collections[0].collection, "users");
    }

    #[test]
    fn empty_document_deserializes() {
        let doc: BootstrapDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.services.is_empty());
        assert!(doc.routes().0.is_empty());
    }
}
