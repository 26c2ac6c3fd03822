use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::pipeline::{Filter, FilterAction};
use crate::registry::RouteRegistry;

/// Matches the (slug-stripped) path against the route registry.
///
/// Runs after authentication so the rate limiter and authorizer downstream
/// can rely on both a route and a principal being present. The control
/// surface is reachable through a built-in `/control/**` route the server
/// registers at startup, so every forwardable path goes through the same
/// lookup.
pub struct RouteMatchFilter {
    registry: Arc<RouteRegistry>,
}

impl RouteMatchFilter {
    #[must_use]
    pub fn new(registry: Arc<RouteRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Filter for RouteMatchFilter {
    fn name(&self) -> &'static str {
        "route-match"
    }

    fn order(&self) -> i32 {
        super::ORDER_ROUTE_MATCH
    }

    async fn pre(&self, exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
        match self.registry.find_by_path(&exchange.path) {
            Some(route) => {
                debug!(
                    route_id = %route.id,
                    path = %exchange.path,
                    "route matched"
                );
                exchange.route = Some(route);
                Ok(FilterAction::Continue)
            }
            None => Ok(FilterAction::ShortCircuit(
                GatewayError::RouteNotFound(exchange.path.clone())
                    .into_envelope(&exchange.original_path, &exchange.correlation_id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use portico_core::RouteDefinition;

    use super::*;

    fn registry() -> Arc<RouteRegistry> {
        let registry = Arc::new(RouteRegistry::new());
        registry
            .add(RouteDefinition {
                id: "users".into(),
                path: "/api/users/**".into(),
                backend_url: "http://users:8080".into(),
                collection: "users".into(),
                service_id: None,
                rate_limit: None,
            })
            .unwrap();
        registry
    }

    fn exchange(path: &str) -> Exchange {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        Exchange::from_request(req, None)
    }

    #[tokio::test]
    async fn sets_route_on_match() {
        let f = RouteMatchFilter::new(registry());
        let mut ex = exchange("/api/users/42");

        assert!(matches!(
            f.pre(&mut ex).await.unwrap(),
            FilterAction::Continue
        ));
        assert_eq!(ex.route.unwrap().id, "users");
    }

    #[tokio::test]
    async fn unmatched_path_is_404() {
        let f = RouteMatchFilter::new(registry());
        let mut ex = exchange("/api/orders/1");

        match f.pre(&mut ex).await.unwrap() {
            FilterAction::ShortCircuit(resp) => {
                assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            }
            FilterAction::Continue => panic!("expected short circuit"),
        }
    }
}
