// JSON handlers: devices, zones, summary, history, recommendations, valves

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::error::{StoreError, ValveError};
use crate::models::ValveStatus;
use crate::recommendations::recommend_all;
use crate::{NAME, VERSION};

const DEFAULT_HISTORY_LIMIT: usize = 60;

/// Handler error mapped to a status code and `{"error": "..."}` body.
pub(super) enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// The realtime store failed or is unreachable.
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::BadGateway(m) => (StatusCode::BAD_GATEWAY, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            _ => ApiError::BadGateway(e.to_string()),
        }
    }
}

impl From<ValveError> for ApiError {
    fn from(e: ValveError) -> Self {
        match e {
            ValveError::Invalid(e) => ApiError::BadRequest(e.to_string()),
            ValveError::Store(e) => e.into(),
        }
    }
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

pub(super) async fn devices_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.snapshot().await.devices.clone())
}

pub(super) async fn zones_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.current_dashboard().await.zones)
}

pub(super) async fn zone_handler(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = state.current_dashboard().await;
    dashboard
        .zone(&label)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("zone {label:?} not found")))
}

pub(super) async fn summary_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.current_dashboard().await.summary)
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    limit: Option<usize>,
}

/// GET /api/history: recent snapshots, oldest first.
pub(super) async fn history_handler(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.history.recent(limit).await)
}

pub(super) async fn recommendations_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(recommend_all(&state.current_dashboard().await.zones))
}

fn valve_body(device_id: &str, status: ValveStatus) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "deviceId": device_id, "status": status }))
}

/// GET /api/devices/{id}/valve: reads through to the store.
pub(super) async fn valve_get_handler(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.valves.read_status(&device_id).await?;
    Ok(valve_body(&device_id, status))
}

#[derive(Debug, Deserialize)]
pub(super) struct ValveCommand {
    status: String,
}

/// PUT /api/devices/{id}/valve with `{"status": "ON" | "OFF"}`.
pub(super) async fn valve_put_handler(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(cmd): Json<ValveCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .valves
        .set_status(&device_id, &cmd.status)
        .await
        .inspect_err(|e| tracing::warn!(device_id = %device_id, error = %e, "valve command rejected"))?;
    Ok(valve_body(&device_id, status))
}
