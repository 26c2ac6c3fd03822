use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use portico_bus::BusHealth;
use portico_gateway::GatewayMetrics;
use portico_state::CacheStore;

use crate::app::AppState;
use crate::bootstrap::BootstrapClient;

/// Dependencies probed by the health endpoint.
#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn CacheStore>,
    pub bus: Option<Arc<BusHealth>>,
    pub control: Arc<BootstrapClient>,
    pub metrics: Arc<GatewayMetrics>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "UPPERCASE")]
enum ComponentStatus {
    Up,
    Down,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Component {
    status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_event_at: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    components: Components,
    gateway: portico_gateway::MetricsSnapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Components {
    cache: Component,
    bus: Component,
    control_plane: Component,
}

/// `GET /actuator/health` -- overall status plus per-dependency liveness.
///
/// A down dependency degrades the report but the endpoint still answers
/// 200: routing continues on last-known configuration and the limiter
/// fails open, so the process stays serviceable.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let health = &state.health;

    let cache_up = health.store.ping().await.is_ok();

    let (bus_up, last_event_at) = match &health.bus {
        Some(bus) => {
            let snap = bus.snapshot();
            (snap.running, snap.last_event_at.map(|t| t.to_rfc3339()))
        }
        None => (false, None),
    };

    let control_up = health.control.ping().await;

    let status = if cache_up && bus_up { "UP" } else { "DEGRADED" };

    let body = HealthResponse {
        status,
        components: Components {
            cache: component(cache_up, None),
            bus: component(bus_up, last_event_at),
            control_plane: component(control_up, None),
        },
        gateway: health.metrics.snapshot(),
    };

    (StatusCode::OK, Json(body))
}

fn component(up: bool, last_event_at: Option<String>) -> Component {
    Component {
        status: if up {
            ComponentStatus::Up
        } else {
            ComponentStatus::Down
        },
        last_event_at,
    }
}
