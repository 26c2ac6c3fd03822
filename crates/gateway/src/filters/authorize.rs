use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::authz_cache::AuthzCache;
use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::pipeline::{Filter, FilterAction};

/// Route authorization: set-intersection of the principal's roles against
/// the collection's route policy for the request method.
///
/// Unpolicied methods proceed (default allow). A policied method with no
/// principal on the exchange is a 401, not a 403: the caller never
/// authenticated.
pub struct AuthorizeFilter {
    authz: Arc<AuthzCache>,
}

impl AuthorizeFilter {
    #[must_use]
    pub fn new(authz: Arc<AuthzCache>) -> Self {
        Self { authz }
    }
}

#[async_trait]
impl Filter for AuthorizeFilter {
    fn name(&self) -> &'static str {
        "route-authz"
    }

    fn order(&self) -> i32 {
        super::ORDER_AUTHORIZE
    }

    async fn pre(&self, exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
        let Some(route) = &exchange.route else {
            return Ok(FilterAction::Continue);
        };

        let Some(config) = self.authz.get(&route.collection) else {
            return Ok(FilterAction::Continue);
        };

        let Some(policy) = config.route_policy_for(exchange.method.as_str()) else {
            debug!(
                collection = %route.collection,
                method = %exchange.method,
                "no route policy for method, allowing"
            );
            return Ok(FilterAction::Continue);
        };

        let Some(principal) = &exchange.principal else {
            return Ok(FilterAction::ShortCircuit(
                GatewayError::Unauthorized("authentication required".into())
                    .into_envelope(&exchange.original_path, &exchange.correlation_id),
            ));
        };

        if principal.satisfies(&policy.required_roles) {
            Ok(FilterAction::Continue)
        } else {
            Ok(FilterAction::ShortCircuit(
                GatewayError::Forbidden(format!(
                    "principal '{}' lacks a required role for {} {}",
                    principal.username, exchange.method, route.collection
                ))
                .into_envelope(&exchange.original_path, &exchange.correlation_id),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};

    use portico_core::{AuthzConfig, Principal, RouteDefinition, RoutePolicy};

    use super::*;

    fn cache() -> Arc<AuthzCache> {
        let cache = Arc::new(AuthzCache::new());
        cache.replace(AuthzConfig {
            collection: "users".into(),
            route_policies: vec![RoutePolicy {
                method: "GET".into(),
                required_roles: BTreeSet::from(["viewer".to_owned()]),
            }],
            field_policies: vec![],
        });
        cache
    }

    fn exchange(method: Method, roles: &[&str]) -> Exchange {
        let req = Request::builder()
            .method(method)
            .uri("/api/users/42")
            .body(Body::empty())
            .unwrap();
        let mut ex = Exchange::from_request(req, None);
        ex.route = Some(Arc::new(RouteDefinition {
            id: "users".into(),
            path: "/api/users/**".into(),
            backend_url: "http://users:8080".into(),
            collection: "users".into(),
            service_id: None,
            rate_limit: None,
        }));
        if !roles.is_empty() {
            ex.principal = Some(Principal::new(
                "u1",
                roles.iter().map(|r| (*r).to_owned()),
            ));
        }
        ex
    }

    #[tokio::test]
    async fn matching_role_proceeds() {
        let f = AuthorizeFilter::new(cache());
        let mut ex = exchange(Method::GET, &["viewer"]);

        assert!(matches!(
            f.pre(&mut ex).await.unwrap(),
            FilterAction::Continue
        ));
    }

    #[tokio::test]
    async fn disjoint_roles_are_403() {
        let f = AuthorizeFilter::new(cache());
        let mut ex = exchange(Method::GET, &["intern"]);

        match f.pre(&mut ex).await.unwrap() {
            FilterAction::ShortCircuit(resp) => {
                assert_eq!(resp.status(), StatusCode::FORBIDDEN);
            }
            FilterAction::Continue => panic!("expected short circuit"),
        }
    }

    #[tokio::test]
    async fn unpolicied_method_defaults_to_allow() {
        let f = AuthorizeFilter::new(cache());
        let mut ex = exchange(Method::DELETE, &["intern"]);

        assert!(matches!(
            f.pre(&mut ex).await.unwrap(),
            FilterAction::Continue
        ));
    }

    #[tokio::test]
    async fn unknown_collection_defaults_to_allow() {
        let f = AuthorizeFilter::new(Arc::new(AuthzCache::new()));
        let mut ex = exchange(Method::GET, &["intern"]);

        assert!(matches!(
            f.pre(&mut ex).await.unwrap(),
            FilterAction::Continue
        ));
    }

    #[tokio::test]
    async fn policied_method_without_principal_is_401() {
        let f = AuthorizeFilter::new(cache());
        let mut ex = exchange(Method::GET, &[]);

        match f.pre(&mut ex).await.unwrap() {
            FilterAction::ShortCircuit(resp) => {
                assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            }
            FilterAction::Continue => panic!("expected short circuit"),
        }
    }
}
