use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use portico_core::AuthzConfig;

/// Per-collection authorization configuration, keyed by collection name.
///
/// Replaced wholesale per collection when an `authz.changed` event arrives.
/// Readers clone an `Arc` under a short read lock; a request that already
/// fetched its config keeps evaluating against that snapshot.
#[derive(Default)]
pub struct AuthzCache {
    configs: RwLock<HashMap<String, Arc<AuthzConfig>>>,
}

impl AuthzCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorization config for a collection, if any exists.
    #[must_use]
    pub fn get(&self, collection: &str) -> Option<Arc<AuthzConfig>> {
        self.configs.read().get(collection).cloned()
    }

    /// Replace the config for its collection.
    pub fn replace(&self, config: AuthzConfig) {
        let collection = config.collection.clone();
        self.configs
            .write()
            .insert(collection.clone(), Arc::new(config));
        info!(collection = %collection, "authorization config replaced");
    }

    /// Remove the config for a collection. Returns `true` if one existed.
    pub fn remove(&self, collection: &str) -> bool {
        self.configs.write().remove(collection).is_some()
    }

    /// Load the full set from bootstrap, dropping anything previously held.
    pub fn load(&self, configs: impl IntoIterator<Item = AuthzConfig>) {
        let mut map = self.configs.write();
        map.clear();
        for config in configs {
            map.insert(config.collection.clone(), Arc::new(config));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.read().is_empty()
    }
}
