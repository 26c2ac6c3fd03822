use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::oidc::TokenVerifier;
use crate::pipeline::{Filter, FilterAction};

use super::PublicPaths;

/// JWT authentication.
///
/// Extracts the bearer token, verifies it through the [`TokenVerifier`],
/// and attaches the resulting principal to the exchange. Requests to the
/// configured unauthenticated paths bypass this filter. Any failure
/// short-circuits with 401; the upstream is never reached without a valid
/// principal.
pub struct AuthFilter {
    verifier: Arc<dyn TokenVerifier>,
    public_paths: PublicPaths,
}

impl AuthFilter {
    #[must_use]
    pub fn new(verifier: Arc<dyn TokenVerifier>, public_paths: PublicPaths) -> Self {
        Self {
            verifier,
            public_paths,
        }
    }
}

#[async_trait]
impl Filter for AuthFilter {
    fn name(&self) -> &'static str {
        "jwt-auth"
    }

    fn order(&self) -> i32 {
        super::ORDER_AUTH
    }

    async fn pre(&self, exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
        if self.public_paths.contains(&exchange.path) {
            return Ok(FilterAction::Continue);
        }

        let token = exchange
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let Some(token) = token else {
            return Ok(FilterAction::ShortCircuit(
                GatewayError::Unauthorized("missing bearer token".into())
                    .into_envelope(&exchange.original_path, &exchange.correlation_id),
            ));
        };

        match self.verifier.verify(token).await {
            Ok(principal) => {
                debug!(
                    username = %principal.username,
                    correlation_id = %exchange.correlation_id,
                    "principal authenticated"
                );
                exchange.principal = Some(principal);
                Ok(FilterAction::Continue)
            }
            Err(e) => Ok(FilterAction::ShortCircuit(
                GatewayError::Unauthorized(e.to_string())
                    .into_envelope(&exchange.original_path, &exchange.correlation_id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use portico_core::Principal;

    use crate::oidc::StaticTokenVerifier;

    use super::*;

    fn filter() -> AuthFilter {
        let verifier = StaticTokenVerifier::new()
            .with_token("good", Principal::new("alice", ["viewer".to_owned()]));
        AuthFilter::new(verifier.into_arc(), PublicPaths::default())
    }

    fn exchange(path: &str, auth: Option<&str>) -> Exchange {
        let mut builder = Request::builder().uri(path);
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        Exchange::from_request(builder.body(Body::empty()).unwrap(), None)
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let f = filter();
        let mut ex = exchange("/api/users", None);

        match f.pre(&mut ex).await.unwrap() {
            FilterAction::ShortCircuit(resp) => {
                assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            }
            FilterAction::Continue => panic!("expected short circuit"),
        }
    }

    #[tokio::test]
    async fn invalid_token_is_401() {
        let f = filter();
        let mut ex = exchange("/api/users", Some("Bearer forged"));

        assert!(matches!(
            f.pre(&mut ex).await.unwrap(),
            FilterAction::ShortCircuit(_)
        ));
        assert!(ex.principal.is_none());
    }

    #[tokio::test]
    async fn valid_token_attaches_principal() {
        let f = filter();
        let mut ex = exchange("/api/users", Some("Bearer good"));

        assert!(matches!(
            f.pre(&mut ex).await.unwrap(),
            FilterAction::Continue
        ));
        assert_eq!(ex.principal.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn public_paths_bypass_authentication() {
        let f = filter();
        let mut ex = exchange("/control/bootstrap", None);

        assert!(matches!(
            f.pre(&mut ex).await.unwrap(),
            FilterAction::Continue
        ));
    }

    #[tokio::test]
    async fn basic_auth_is_not_a_bearer_token() {
        let f = filter();
        let mut ex = exchange("/api/users", Some("Basic dXNlcjpwYXNz"));

        assert!(matches!(
            f.pre(&mut ex).await.unwrap(),
            FilterAction::ShortCircuit(_)
        ));
    }
}
