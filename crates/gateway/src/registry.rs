use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, info};

use portico_core::{RouteDefinition, RouteValidationError};

/// One entry in the path index, ordered for deterministic matching.
struct IndexEntry {
    /// Literal prefix length, cached for ordering.
    prefix_len: usize,
    /// Insertion sequence; preserved across updates so ties stay stable.
    seq: u64,
    route: Arc<RouteDefinition>,
}

#[derive(Default)]
struct RegistryInner {
    by_id: HashMap<String, Arc<RouteDefinition>>,
    /// Sorted by longest literal prefix first, then insertion order.
    index: Vec<IndexEntry>,
    /// Insertion sequence per route id, stable across updates.
    seqs: HashMap<String, u64>,
    next_seq: u64,
}

impl RegistryInner {
    fn rebuild_index(&mut self) {
        self.index = self
            .by_id
            .values()
            .map(|route| IndexEntry {
                prefix_len: route.literal_prefix().len(),
                seq: self.seqs.get(&route.id).copied().unwrap_or(u64::MAX),
                route: Arc::clone(route),
            })
            .collect();
        self.index
            .sort_by(|a, b| b.prefix_len.cmp(&a.prefix_len).then(a.seq.cmp(&b.seq)));
    }
}

/// The dynamic route registry.
///
/// Reads take a short read lock and scan a pre-sorted index; writes take
/// the exclusive lock, so a route added by an event is visible to the next
/// `find_by_path` as soon as the write lock is released.
///
/// Matching is longest-literal-prefix-wins: given `/api/users/**` and
/// `/api/**`, the path `/api/users/42` matches the former. Ties between
/// equal-length prefixes resolve by insertion order.
#[derive(Default)]
pub struct RouteRegistry {
    inner: RwLock<RegistryInner>,
}

impl RouteRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. Rejects invalid definitions and duplicate ids, leaving
    /// the registry unchanged.
    pub fn add(&self, route: RouteDefinition) -> Result<(), RouteValidationError> {
        route.validate().inspect_err(|e| {
            error!(error = %e, "rejecting invalid route");
        })?;

        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&route.id) {
            // `update` is the upsert path; `add` keeps insert semantics.
            info!(route_id = %route.id, "route already present, ignoring add");
            return Ok(());
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.seqs.insert(route.id.clone(), seq);
        inner.by_id.insert(route.id.clone(), Arc::new(route));
        inner.rebuild_index();
        Ok(())
    }

    /// Insert or replace a route by id. The replacement is atomic: readers
    /// observe either the old or the new definition, never a mix.
    pub fn update(&self, route: RouteDefinition) -> Result<(), RouteValidationError> {
        route.validate().inspect_err(|e| {
            error!(error = %e, "rejecting invalid route");
        })?;

        let mut inner = self.inner.write();
        if !inner.seqs.contains_key(&route.id) {
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.seqs.insert(route.id.clone(), seq);
        }
        inner.by_id.insert(route.id.clone(), Arc::new(route));
        inner.rebuild_index();
        Ok(())
    }

    /// Remove a route by id. Returns `true` if it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        let existed = inner.by_id.remove(id).is_some();
        if existed {
            inner.seqs.remove(id);
            inner.rebuild_index();
        }
        existed
    }

    /// Remove every route owned by the given service. Returns the removed
    /// route ids (fan-out delete for `service.changed / DELETED`).
    pub fn remove_by_service(&self, service_id: &str) -> Vec<String> {
        let mut inner = self.inner.write();
        let removed: Vec<String> = inner
            .by_id
            .values()
            .filter(|r| r.service_id.as_deref() == Some(service_id))
            .map(|r| r.id.clone())
            .collect();

        if !removed.is_empty() {
            for id in &removed {
                inner.by_id.remove(id);
                inner.seqs.remove(id);
            }
            inner.rebuild_index();
        }
        removed
    }

    /// Find the route matching a (slug-stripped) request path.
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<Arc<RouteDefinition>> {
        let inner = self.inner.read();
        inner
            .index
            .iter()
            .find(|entry| entry.route.match_path(path).is_some())
            .map(|entry| Arc::clone(&entry.route))
    }

    /// Look up a route by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<RouteDefinition>> {
        self.inner.read().by_id.get(id).cloned()
    }

    /// All routes, in no particular order.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<RouteDefinition>> {
        self.inner.read().by_id.values().cloned().collect()
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_id.is_empty()
    }

    /// Drop every route.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_id.clear();
        inner.seqs.clear();
        inner.index.clear();
    }
}
