use std::sync::Arc;

use tracing::{debug, warn};

use portico_core::jsonapi::{ResourceIdentifier, ResourceObject};
use portico_state::{CacheStore, jsonapi_key};

/// Result of resolving related resources from the cache.
#[derive(Debug, Default)]
pub struct ResolvedIncludes {
    pub resources: Vec<ResourceObject>,
    /// True when the cache was unreachable and resolution was abandoned.
    pub degraded: bool,
}

/// Looks up related resources in the shared cache by `{type, id}`.
///
/// Cache misses are normal (the resource was never cached or expired) and
/// are skipped. A cache connection failure abandons the whole resolution:
/// the response goes out without includes and a single warning is logged.
pub struct IncludeResolver {
    store: Arc<dyn CacheStore>,
}

impl IncludeResolver {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Resolve each identifier to its cached resource.
    pub async fn resolve(
        &self,
        identifiers: impl IntoIterator<Item = ResourceIdentifier> + Send,
    ) -> ResolvedIncludes {
        let mut resolved = ResolvedIncludes::default();

        for identifier in identifiers {
            let key = jsonapi_key(&identifier.kind, &identifier.id);
            match self.store.get(&key).await {
                Ok(Some(raw)) => match serde_json::from_str::<ResourceObject>(&raw) {
                    Ok(resource) => resolved.resources.push(resource),
                    Err(e) => {
                        warn!(key = %key, error = %e, "cached resource is not a valid resource object, skipping");
                    }
                },
                Ok(None) => {
                    debug!(key = %key, "include cache miss");
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "include cache unavailable, resolving no includes");
                    resolved.resources.clear();
                    resolved.degraded = true;
                    return resolved;
                }
            }
        }

        resolved
    }
}
