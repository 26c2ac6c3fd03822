use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use portico_bus::EventHandler;
use portico_core::event::{ChangeType, CollectionEntity, ConfigChange};
use portico_core::{ConfigEvent, RouteDefinition};

use crate::authz_cache::AuthzCache;
use crate::registry::RouteRegistry;

/// Applies decoded configuration events to the in-process registry and
/// caches. Registered as the handler for all three event types.
///
/// A malformed entity never propagates an error: it is logged and the
/// event dropped, keeping the consumer loop alive.
pub struct ConfigEventApplier {
    registry: Arc<RouteRegistry>,
    authz: Arc<AuthzCache>,
    /// Poked on authz events so the server refreshes the tenant slug map.
    tenant_refresh: Option<Arc<Notify>>,
}

impl ConfigEventApplier {
    #[must_use]
    pub fn new(registry: Arc<RouteRegistry>, authz: Arc<AuthzCache>) -> Self {
        Self {
            registry,
            authz,
            tenant_refresh: None,
        }
    }

    /// Wire the notifier poked when an authz event lands.
    #[must_use]
    pub fn with_tenant_refresh(mut self, notify: Arc<Notify>) -> Self {
        self.tenant_refresh = Some(notify);
        self
    }

    fn apply_collection(&self, change: ChangeType, collection: CollectionEntity) {
        match change {
            ChangeType::Created | ChangeType::Updated => {
                let Some(route) = route_from_collection(&collection) else {
                    warn!(
                        collection_id = %collection.id,
                        "collection event lacks path or backend URL, skipping"
                    );
                    return;
                };
                if let Err(e) = self.registry.update(route) {
                    warn!(collection_id = %collection.id, error = %e, "rejected route from event");
                } else {
                    info!(collection_id = %collection.id, "route upserted from event");
                }
            }
            ChangeType::Deleted => {
                let removed = self.registry.remove(&collection.id);
                info!(collection_id = %collection.id, removed, "route removal from event");
            }
        }
    }

    fn apply_service(&self, change: ChangeType, service_id: &str) {
        match change {
            ChangeType::Deleted => {
                let removed = self.registry.remove_by_service(service_id);
                info!(
                    service_id = %service_id,
                    routes = removed.len(),
                    "service deleted, routes removed"
                );
            }
            ChangeType::Created | ChangeType::Updated => {
                // Routing only changes through collection events; the
                // service entity itself carries no route state.
                debug!(service_id = %service_id, "ignoring non-delete service event");
            }
        }
    }
}

/// Project a collection entity to its route. `None` when the entity is
/// incomplete.
fn route_from_collection(collection: &CollectionEntity) -> Option<RouteDefinition> {
    let path = collection.path.clone()?;
    let backend_url = collection.backend_url.clone()?;
    Some(RouteDefinition {
        id: collection.id.clone(),
        path,
        backend_url,
        collection: collection
            .name
            .clone()
            .unwrap_or_else(|| collection.id.clone()),
        service_id: collection.service_id.clone(),
        rate_limit: collection.rate_limit,
    })
}

#[async_trait]
impl EventHandler for ConfigEventApplier {
    async fn handle(&self, event: ConfigEvent) {
        let change = match event.change() {
            Ok(change) => change,
            Err(e) => {
                warn!(
                    event_id = %event.event_id,
                    error = %e,
                    "skipping undecodable configuration event"
                );
                return;
            }
        };

        match change {
            ConfigChange::Collection { change, collection } => {
                self.apply_collection(change, collection);
            }
            ConfigChange::Authz { change, authz } => {
                let collection = authz.collection.clone();
                match change {
                    ChangeType::Created | ChangeType::Updated => self.authz.replace(authz),
                    ChangeType::Deleted => {
                        self.authz.remove(&collection);
                        info!(collection = %collection, "authz config removed from event");
                    }
                }
                if let Some(notify) = &self.tenant_refresh {
                    notify.notify_one();
                }
            }
            ConfigChange::Service { change, service } => {
                self.apply_service(change, &service.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applier() -> (ConfigEventApplier, Arc<RouteRegistry>, Arc<AuthzCache>) {
        let registry = Arc::new(RouteRegistry::new());
        let authz = Arc::new(AuthzCache::new());
        (
            ConfigEventApplier::new(Arc::clone(&registry), Arc::clone(&authz)),
            registry,
            authz,
        )
    }

    fn event(event_type: &str, change: &str, entity: serde_json::Value) -> ConfigEvent {
        serde_json::from_value(serde_json::json!({
            "eventId": "e1",
            "eventType": event_type,
            "timestamp": "2025-01-01T00:00:00Z",
            "payload": {"changeType": change, "entity": entity}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn collection_created_registers_route() {
        let (applier, registry, _) = applier();

        applier
            .handle(event(
                "config.collection.changed",
                "CREATED",
                serde_json::json!({
                    "id": "col-users",
                    "name": "users",
                    "path": "/api/users/**",
                    "serviceId": "svc-1",
                    "backendUrl": "http://users:8080"
                }),
            ))
            .await;

        let route = registry.find_by_path("/api/users/42").unwrap();
        assert_eq!(route.id, "col-users");
        assert_eq!(route.collection, "users");
    }

    #[tokio::test]
    async fn collection_deleted_removes_route() {
        let (applier, registry, _) = applier();

        applier
            .handle(event(
                "config.collection.changed",
                "CREATED",
                serde_json::json!({
                    "id": "col-users",
                    "path": "/api/users/**",
                    "backendUrl": "http://users:8080"
                }),
            ))
            .await;
        applier
            .handle(event(
                "config.collection.changed",
                "DELETED",
                serde_json::json!({"id": "col-users"}),
            ))
            .await;

        assert!(registry.find_by_path("/api/users/42").is_none());
    }

    #[tokio::test]
    async fn service_deleted_fans_out() {
        let (applier, registry, _) = applier();

        for (id, path) in [("col-a", "/api/a/**"), ("col-b", "/api/b/**")] {
            applier
                .handle(event(
                    "config.collection.changed",
                    "CREATED",
                    serde_json::json!({
                        "id": id,
                        "path": path,
                        "serviceId": "svc-1",
                        "backendUrl": "http://svc:8080"
                    }),
                ))
                .await;
        }

        applier
            .handle(event(
                "config.service.changed",
                "DELETED",
                serde_json::json!({"id": "svc-1"}),
            ))
            .await;

        assert!(registry.find_by_path("/api/a/1").is_none());
        assert!(registry.find_by_path("/api/b/1").is_none());
    }

    #[tokio::test]
    async fn authz_event_replaces_config() {
        let (applier, _, authz) = applier();

        applier
            .handle(event(
                "config.authz.changed",
                "UPDATED",
                serde_json::json!({
                    "collectionId": "users",
                    "routePolicies": [{"method": "GET", "requiredRoles": ["viewer"]}]
                }),
            ))
            .await;

        let cfg = authz.get("users").unwrap();
        assert!(cfg.route_policy_for("GET").is_some());
    }

    #[tokio::test]
    async fn incomplete_collection_entity_is_skipped() {
        let (applier, registry, _) = applier();

        applier
            .handle(event(
                "config.collection.changed",
                "CREATED",
                serde_json::json!({"id": "col-broken"}),
            ))
            .await;

        assert!(registry.is_empty());
    }
}
