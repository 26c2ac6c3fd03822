use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::info;

/// Slug-to-tenant-id mapping, refreshed from the control plane and on
/// authz events.
#[derive(Default)]
pub struct TenantSlugCache {
    slugs: RwLock<HashMap<String, String>>,
}

impl TenantSlugCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a slug to its tenant id.
    #[must_use]
    pub fn resolve(&self, slug: &str) -> Option<String> {
        self.slugs.read().get(slug).cloned()
    }

    /// Insert or update one slug mapping.
    pub fn upsert(&self, slug: impl Into<String>, tenant_id: impl Into<String>) {
        self.slugs.write().insert(slug.into(), tenant_id.into());
    }

    /// Remove a slug. Returns `true` if it existed.
    pub fn remove(&self, slug: &str) -> bool {
        self.slugs.write().remove(slug).is_some()
    }

    /// Replace the whole mapping (periodic refresh path).
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (String, String)>) {
        let map: HashMap<String, String> = entries.into_iter().collect();
        let count = map.len();
        *self.slugs.write() = map;
        info!(count, "tenant slug cache refreshed");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slugs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slugs.read().is_empty()
    }
}

/// Whether a path segment is syntactically a tenant slug: ASCII
/// alphanumerics and dashes, not starting with a dash.
#[must_use]
pub fn is_slug_shaped(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('-')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_after_upsert_and_replace() {
        let cache = TenantSlugCache::new();
        cache.upsert("tenant-a", "t1");
        assert_eq!(cache.resolve("tenant-a").as_deref(), Some("t1"));

        cache.replace_all(vec![("tenant-b".to_owned(), "t2".to_owned())]);
        assert_eq!(cache.resolve("tenant-a"), None);
        assert_eq!(cache.resolve("tenant-b").as_deref(), Some("t2"));
    }

    #[test]
    fn slug_shape() {
        assert!(is_slug_shaped("tenant-a"));
        assert!(is_slug_shaped("tenantA"));
        assert!(is_slug_shaped("t1"));
        assert!(!is_slug_shaped(""));
        assert!(!is_slug_shaped("-leading"));
        assert!(!is_slug_shaped("has_underscore"));
    }
}
