use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// Gates access to one HTTP method on a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePolicy {
    /// HTTP method this policy applies to, uppercase (`GET`, `POST`, ...).
    pub method: String,
    /// Roles that may use the method. Satisfied by set-intersection.
    pub required_roles: BTreeSet<String>,
}

/// Gates visibility of one attribute on a collection's resources.
///
/// Applied identically to primary and included resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPolicy {
    /// Attribute name inside `attributes`.
    #[serde(alias = "fieldName")]
    pub field: String,
    /// Roles that may see the field.
    pub required_roles: BTreeSet<String>,
}

/// Authorization configuration for a single collection.
///
/// Replaced wholesale when an `authz.changed` event arrives; policies are
/// evaluated in declaration order and the first matching route policy wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthzConfig {
    /// Collection this configuration belongs to.
    #[serde(alias = "collectionId")]
    pub collection: String,

    #[serde(default)]
    pub route_policies: Vec<RoutePolicy>,

    #[serde(default)]
    pub field_policies: Vec<FieldPolicy>,
}

impl AuthzConfig {
    /// First route policy declared for the given method, if any.
    ///
    /// `None` means the method is unpolicied and the request proceeds
    /// (default allow).
    #[must_use]
    pub fn route_policy_for(&self, method: &str) -> Option<&RoutePolicy> {
        self.route_policies
            .iter()
            .find(|p| p.method.eq_ignore_ascii_case(method))
    }

    /// Field policy for the given attribute, if any.
    #[must_use]
    pub fn field_policy_for(&self, field: &str) -> Option<&FieldPolicy> {
        self.field_policies.iter().find(|p| p.field == field)
    }

    /// Whether the principal may see the given attribute.
    ///
    /// Unpolicied fields are always visible.
    #[must_use]
    pub fn field_visible(&self, field: &str, principal: &Principal) -> bool {
        self.field_policy_for(field)
            .is_none_or(|p| principal.satisfies(&p.required_roles))
    }

    /// Whether this configuration has any field policies at all.
    ///
    /// Drives transformer activation: a collection with no field policies
    /// and no `include` parameter streams through untouched.
    #[must_use]
    pub fn has_field_policies(&self) -> bool {
        !self.field_policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    fn config() -> AuthzConfig {
        AuthzConfig {
            collection: "users".into(),
            route_policies: vec![
                RoutePolicy {
                    method: "GET".into(),
                    required_roles: roles(&["viewer"]),
                },
                RoutePolicy {
                    method: "POST".into(),
                    required_roles: roles(&["admin"]),
                },
            ],
            field_policies: vec![FieldPolicy {
                field: "email".into(),
                required_roles: roles(&["admin"]),
            }],
        }
    }

    #[test]
    fn route_policy_lookup_is_case_insensitive() {
        let cfg = config();
        assert!(cfg.route_policy_for("get").is_some());
        assert!(cfg.route_policy_for("DELETE").is_none());
    }

    #[test]
    fn field_visibility_follows_policy() {
        let cfg = config();
        let viewer = Principal::new("v", ["viewer".to_owned()]);
        let admin = Principal::new("a", ["admin".to_owned()]);

        assert!(!cfg.field_visible("email", &viewer));
        assert!(cfg.field_visible("email", &admin));
        // Unpolicied field is visible to everyone.
        assert!(cfg.field_visible("name", &viewer));
    }
}
