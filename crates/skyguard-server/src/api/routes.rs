//! REST API routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use skyguard_core::{AircraftReport, AvoidanceAction, Conflict, ConflictZone, CycleReport};

use crate::api::ws;
use crate::state::{AppState, SubmitError};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/snapshots", post(submit_snapshot))
        .route("/v1/conflicts", get(list_conflicts))
        .route("/v1/advisories", get(list_advisories))
        .route("/v1/advisories/:aircraft_id", get(get_advisories))
        .route("/v1/report", get(get_report))
        .route("/v1/zones", get(list_zones))
        .route("/v1/ws", get(ws::ws_handler))
}

/// Body of `POST /v1/snapshots`.
#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    /// Epoch the snapshot describes; server time when absent
    #[serde(default)]
    pub epoch: Option<DateTime<Utc>>,
    pub aircraft: Vec<AircraftReport>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ConflictQuery {
    pub aircraft_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AdvisoryQuery {
    pub aircraft_id: Option<String>,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "sequence": state.current_sequence(),
        "last_report": state.latest_report().map(|r| r.sequence),
    }))
}

async fn submit_snapshot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SnapshotRequest>,
) -> impl IntoResponse {
    let epoch = request.epoch.unwrap_or_else(Utc::now);
    match state.submit_snapshot(epoch, request.aircraft) {
        Ok(outcome) => (StatusCode::ACCEPTED, Json(json!(outcome))),
        Err(e @ SubmitError::TooManyAircraft { .. }) => {
            tracing::warn!("Refusing snapshot: {}", e);
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn list_conflicts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConflictQuery>,
) -> Json<Vec<Conflict>> {
    let conflicts = state.get_conflicts();

    if let Some(aircraft_id) = query.aircraft_id {
        let filtered = conflicts
            .into_iter()
            .filter(|conflict| conflict.involves(&aircraft_id))
            .collect();
        return Json(filtered);
    }

    Json(conflicts)
}

async fn list_advisories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdvisoryQuery>,
) -> Json<BTreeMap<String, Vec<AvoidanceAction>>> {
    let mut advisories: BTreeMap<String, Vec<AvoidanceAction>> =
        state.get_advisories().into_iter().collect();

    if let Some(aircraft_id) = query.aircraft_id {
        advisories.retain(|id, _| *id == aircraft_id);
    }

    Json(advisories)
}

async fn get_advisories(
    State(state): State<Arc<AppState>>,
    Path(aircraft_id): Path<String>,
) -> Json<Vec<AvoidanceAction>> {
    Json(state.advisories_for(&aircraft_id))
}

async fn get_report(State(state): State<Arc<AppState>>) -> Result<Json<CycleReport>, StatusCode> {
    state
        .latest_report()
        .map(|report| Json(report.as_ref().clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_zones(State(state): State<Arc<AppState>>) -> Json<Vec<ConflictZone>> {
    Json(state.zones())
}
