//! JSON:API document transformation: field-level authorization and include
//! splicing.

use std::collections::BTreeSet;

use portico_core::jsonapi::{JsonApiDocument, ResourceIdentifier, ResourceObject};
use portico_core::{AuthzConfig, Principal};

use crate::include::IncludeResolver;

/// Remove attributes the principal may not see, from primary and included
/// resources alike.
///
/// Idempotent: applying it twice yields the same document.
pub fn apply_field_policies(
    doc: &mut JsonApiDocument,
    authz: &AuthzConfig,
    principal: &Principal,
) {
    if !authz.has_field_policies() {
        return;
    }

    for resource in doc.primary_mut() {
        filter_resource(resource, authz, principal);
    }
    for resource in &mut doc.included {
        filter_resource(resource, authz, principal);
    }
}

fn filter_resource(resource: &mut ResourceObject, authz: &AuthzConfig, principal: &Principal) {
    resource
        .attributes
        .retain(|field, _| authz.field_visible(field, principal));
}

/// Resolve the requested relationship names against the cache and splice
/// the hits into `included`.
///
/// Relationship names the primary resources do not carry are silently
/// skipped. Returns `true` when resolution was degraded by a cache failure.
pub async fn splice_includes(
    doc: &mut JsonApiDocument,
    include_names: &[String],
    resolver: &IncludeResolver,
) -> bool {
    if include_names.is_empty() {
        return false;
    }

    // Identifiers already present in `included` need no lookup.
    let already_included: BTreeSet<ResourceIdentifier> =
        doc.included.iter().map(ResourceObject::identifier).collect();

    let mut wanted: Vec<ResourceIdentifier> = Vec::new();
    let mut seen: BTreeSet<ResourceIdentifier> = BTreeSet::new();

    for resource in doc.primary() {
        for name in include_names {
            let Some(relationship) = resource.relationships.get(name) else {
                continue;
            };
            for identifier in relationship.identifiers() {
                if already_included.contains(identifier) || !seen.insert(identifier.clone()) {
                    continue;
                }
                wanted.push(identifier.clone());
            }
        }
    }

    let resolved = resolver.resolve(wanted).await;
    for resource in resolved.resources {
        doc.push_included(resource);
    }

    // Invariant: everything in `included` is referenced from `data`.
    doc.retain_referenced_included();

    resolved.degraded
}
