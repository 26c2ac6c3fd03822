use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, Response, StatusCode};
use axum::routing::get;
use tower::ServiceBuilder;
use tower::limit::ConcurrencyLimitLayer;
use tower::load_shed::LoadShedLayer;
use tower_http::trace::TraceLayer;

use portico_gateway::GatewayCore;

use crate::health::{self, HealthState};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The traffic plane.
    pub core: Arc<GatewayCore>,
    /// Health probe dependencies.
    pub health: HealthState,
}

/// Build the Axum router: the health endpoint plus a catch-all that hands
/// every other exchange to the gateway core.
///
/// Backpressure sits in front of everything: beyond `max_in_flight`
/// concurrent exchanges the load-shed layer answers 503 without touching
/// the pipeline.
pub fn router(state: AppState, max_in_flight: usize) -> Router {
    Router::new()
        .route("/actuator/health", get(health::health))
        .fallback(proxy)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|_err: tower::BoxError| async {
                    StatusCode::SERVICE_UNAVAILABLE
                }))
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(max_in_flight)),
        )
        .layer(TraceLayer::new_for_http())
}

/// Every non-health request becomes a gateway exchange.
async fn proxy(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    state.core.handle(request, client_ip).await
}
