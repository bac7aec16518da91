// HTTP + WebSocket routes for dashboard pages

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregation::build_snapshot;
use crate::history::SnapshotHistory;
use crate::models::DashboardSnapshot;
use crate::registry::DeviceRegistry;
use crate::valve::ValveController;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dashboard_tx: broadcast::Sender<DashboardSnapshot>,
    pub(crate) registry: Arc<DeviceRegistry>,
    pub(crate) history: Arc<SnapshotHistory>,
    pub(crate) valves: Arc<ValveController>,
    pub(crate) ws_dashboard_connections: Arc<AtomicUsize>,
}

impl AppState {
    /// Latest published snapshot, or one built from the registry before the first publish.
    pub(crate) async fn current_dashboard(&self) -> DashboardSnapshot {
        if let Some(snapshot) = self.history.latest().await {
            return snapshot;
        }
        let registry = self.registry.snapshot().await;
        build_snapshot(
            &registry.devices,
            registry.generation,
            registry.refreshed_at,
        )
    }
}

pub fn app(
    dashboard_tx: broadcast::Sender<DashboardSnapshot>,
    registry: Arc<DeviceRegistry>,
    history: Arc<SnapshotHistory>,
    valves: Arc<ValveController>,
    ws_dashboard_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        dashboard_tx,
        registry,
        history,
        valves,
        ws_dashboard_connections,
    };
    Router::new()
        .route("/", get(|| async { "farmwatch: zone monitor is running" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/devices", get(http::devices_handler)) // GET /api/devices
        .route("/api/zones", get(http::zones_handler)) // GET /api/zones
        .route("/api/zones/{label}", get(http::zone_handler)) // GET /api/zones/{label}
        .route("/api/summary", get(http::summary_handler)) // GET /api/summary
        .route("/api/history", get(http::history_handler)) // GET /api/history?limit=N
        .route("/api/recommendations", get(http::recommendations_handler)) // GET /api/recommendations
        .route(
            "/api/devices/{id}/valve",
            get(http::valve_get_handler).put(http::valve_put_handler),
        ) // GET, PUT /api/devices/{id}/valve
        .route("/ws/dashboard", get(ws::ws_dashboard)) // WS /ws/dashboard
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
