use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-route rate limit: a request budget over a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum number of requests allowed per window.
    pub requests_per_window: u64,
    /// Window duration in seconds.
    pub window_seconds: u64,
}

impl RateLimitPolicy {
    /// The window as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// A candidate route failed validation and was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteValidationError {
    #[error("route is missing an id")]
    MissingId,

    #[error("route '{0}' is missing a path")]
    MissingPath(String),

    #[error("route '{0}' is missing a backend URL")]
    MissingBackendUrl(String),

    #[error("route '{id}' has a relative backend URL '{url}'")]
    RelativeBackendUrl { id: String, url: String },
}

/// A single routing rule: a path pattern mapped to a backend service.
///
/// Routes are immutable once constructed; updates replace the whole
/// definition atomically in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Unique route identifier.
    pub id: String,

    /// Path pattern. A trailing `/**` matches any suffix after the literal
    /// prefix segments (e.g. `/api/users/**` matches `/api/users/42`).
    pub path: String,

    /// Absolute base URL of the backend service.
    pub backend_url: String,

    /// Collection name used as the authorization lookup key.
    pub collection: String,

    /// Owning service; used for fan-out deletion when a service is removed.
    #[serde(default)]
    pub service_id: Option<String>,

    /// Optional per-route rate limit. Routes without one fall back to the
    /// gateway default.
    #[serde(default)]
    pub rate_limit: Option<RateLimitPolicy>,
}

impl RouteDefinition {
    /// Check the invariants every admitted route must satisfy: non-empty
    /// `id`, `path`, and an absolute `backend_url`.
    pub fn validate(&self) -> Result<(), RouteValidationError> {
        if self.id.trim().is_empty() {
            return Err(RouteValidationError::MissingId);
        }
        if self.path.trim().is_empty() {
            return Err(RouteValidationError::MissingPath(self.id.clone()));
        }
        if self.backend_url.trim().is_empty() {
            return Err(RouteValidationError::MissingBackendUrl(self.id.clone()));
        }
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            return Err(RouteValidationError::RelativeBackendUrl {
                id: self.id.clone(),
                url: self.backend_url.clone(),
            });
        }
        Ok(())
    }

    /// The literal prefix of the pattern, with any trailing `/**` removed
    /// and no trailing slash.
    #[must_use]
    pub fn literal_prefix(&self) -> &str {
        let prefix = self
            .path
            .strip_suffix("/**")
            .or_else(|| self.path.strip_suffix("**"))
            .unwrap_or(&self.path);
        prefix.trim_end_matches('/')
    }

    /// Whether the pattern carries a trailing wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.path.ends_with("**")
    }

    /// Match a request path against this route's pattern.
    ///
    /// Returns the suffix captured by the wildcard (`""` for an exact match)
    /// or `None` when the path does not match. Matching is segment-aligned:
    /// `/api/users/**` matches `/api/users` and `/api/users/42` but not
    /// `/api/users2`.
    #[must_use]
    pub fn match_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        let prefix = self.literal_prefix();

        if self.is_wildcard() {
            let rest = path.strip_prefix(prefix)?;
            if rest.is_empty() {
                return Some("");
            }
            // Require a segment boundary right after the literal prefix.
            rest.starts_with('/').then(|| &rest[1..])
        } else {
            (path.trim_end_matches('/') == prefix).then_some("")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str) -> RouteDefinition {
        RouteDefinition {
            id: "r1".into(),
            path: path.into(),
            backend_url: "http://users:8080".into(),
            collection: "users".into(),
            service_id: None,
            rate_limit: None,
        }
    }

    #[test]
    fn validate_accepts_complete_route() {
        assert!(route("/api/users/**").validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let mut r = route("/api/users/**");
        r.id = String::new();
        assert_eq!(r.validate(), Err(RouteValidationError::MissingId));

        let mut r = route("");
        assert_eq!(
            r.validate(),
            Err(RouteValidationError::MissingPath("r1".into()))
        );

        r = route("/api/users/**");
        r.backend_url = String::new();
        assert_eq!(
            r.validate(),
            Err(RouteValidationError::MissingBackendUrl("r1".into()))
        );
    }

    #[test]
    fn validate_rejects_relative_backend() {
        let mut r = route("/api/users/**");
        r.backend_url = "users:8080".into();
        assert!(matches!(
            r.validate(),
            Err(RouteValidationError::RelativeBackendUrl { .. })
        ));
    }

    #[test]
    fn wildcard_captures_suffix() {
        let r = route("/api/users/**");
        assert_eq!(r.match_path("/api/users/42"), Some("42"));
        assert_eq!(r.match_path("/api/users/42/posts"), Some("42/posts"));
        assert_eq!(r.match_path("/api/users"), Some(""));
        assert_eq!(r.match_path("/api/users2"), None);
        assert_eq!(r.match_path("/api/orders/1"), None);
    }

    #[test]
    fn exact_pattern_requires_full_match() {
        let r = route("/api/status");
        assert_eq!(r.match_path("/api/status"), Some(""));
        assert_eq!(r.match_path("/api/status/"), Some(""));
        assert_eq!(r.match_path("/api/status/x"), None);
    }

    #[test]
    fn literal_prefix_strips_wildcard() {
        assert_eq!(route("/api/users/**").literal_prefix(), "/api/users");
        assert_eq!(route("/api/**").literal_prefix(), "/api");
        assert_eq!(route("/api/status").literal_prefix(), "/api/status");
    }
}
