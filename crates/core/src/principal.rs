use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// The authenticated identity attached to an exchange.
///
/// Built once by the JWT filter and read-only for the rest of the pipeline;
/// the role set is captured at authentication time and never changes during
/// the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Subject name from the token (`preferred_username` or `sub`).
    pub username: String,

    /// Role set. Ordered so header rendering is deterministic.
    pub roles: BTreeSet<String>,

    /// Remaining token claims, passed through for downstream policy hooks.
    #[serde(default)]
    pub claims: HashMap<String, serde_json::Value>,
}

impl Principal {
    /// Create a principal with no extra claims.
    #[must_use]
    pub fn new(username: impl Into<String>, roles: impl IntoIterator<Item = String>) -> Self {
        Self {
            username: username.into(),
            roles: roles.into_iter().collect(),
            claims: HashMap::new(),
        }
    }

    /// Whether this principal's roles intersect the given required set.
    ///
    /// Policy evaluation is set-intersection: one shared role satisfies the
    /// policy.
    #[must_use]
    pub fn satisfies(&self, required: &BTreeSet<String>) -> bool {
        self.roles.iter().any(|r| required.contains(r))
    }

    /// Roles joined with commas, for the `X-Forwarded-Roles` header.
    #[must_use]
    pub fn roles_header(&self) -> String {
        let mut out = String::new();
        for role in &self.roles {
            if !out.is_empty() {
                out.push(',');
            }
            out.push_str(role);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn satisfies_on_any_shared_role() {
        let p = Principal::new("alice", ["viewer".to_owned(), "editor".to_owned()]);
        assert!(p.satisfies(&roles(&["editor", "admin"])));
        assert!(!p.satisfies(&roles(&["admin"])));
        assert!(!p.satisfies(&roles(&[])));
    }

    #[test]
    fn roles_header_is_sorted_and_comma_joined() {
        let p = Principal::new("alice", ["viewer".to_owned(), "admin".to_owned()]);
        assert_eq!(p.roles_header(), "admin,viewer");
    }
}
