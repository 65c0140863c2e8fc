// Handlers: sampling actions, captured statistics, diffs

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{ConductorError, Result};
use crate::models::{ActionOutcome, DiffFilter, SamplingRecord, SnapshotDiff, SnapshotStatistics};

#[derive(Debug, Deserialize)]
pub(super) struct SamplingRequest {
    action: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SnapshotList {
    network: String,
    snapshots: Vec<String>,
}

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST .../{network}/{snapshot}/sampling — body {"action": "begin" | "end"}.
pub(super) async fn post_sampling(
    State(state): State<AppState>,
    Path((network, snapshot)): Path<(String, String)>,
    body: std::result::Result<Json<SamplingRequest>, JsonRejection>,
) -> Result<Json<ActionOutcome>> {
    let Json(request) = body.map_err(|e| {
        ConductorError::Validation(format!("invalid sampling request: {}", e.body_text()))
    })?;
    tracing::info!(%network, %snapshot, action = %request.action, "sampling action requested");
    let outcome = state
        .sampling
        .apply_action(&network, &snapshot, &request.action)
        .await?;
    Ok(Json(outcome))
}

/// GET .../{network}/{snapshot}/sampling — current interval state and markers.
pub(super) async fn get_sampling(
    State(state): State<AppState>,
    Path((network, snapshot)): Path<(String, String)>,
) -> Result<Json<SamplingRecord>> {
    Ok(Json(state.sampling.status(&network, &snapshot).await?))
}

/// GET .../{network}/{snapshot}/state — 404 until the first interval has ended.
pub(super) async fn get_state(
    State(state): State<AppState>,
    Path((network, snapshot)): Path<(String, String)>,
) -> Result<Json<SnapshotStatistics>> {
    let tree = state.repo.load_statistics(&network, &snapshot).await?;
    Ok(Json(SnapshotStatistics {
        network,
        snapshot,
        state: tree,
    }))
}

pub(super) async fn list_snapshots(
    State(state): State<AppState>,
    Path(network): Path<String>,
) -> Result<Json<SnapshotList>> {
    let snapshots = state.repo.list_snapshots(&network).await?;
    Ok(Json(SnapshotList { network, snapshots }))
}

/// GET .../{network}/{snapshot}/diff — snapshot vs. the baseline snapshot.
pub(super) async fn get_baseline_diff(
    State(state): State<AppState>,
    Path((network, snapshot)): Path<(String, String)>,
) -> Result<Json<SnapshotDiff>> {
    Ok(Json(state.diff.diff_to_baseline(&network, &snapshot).await?))
}

/// GET /state-conductor/usecase/{usecase}/{network}/{source}/{destination}/diff
pub(super) async fn get_scaled_diff(
    State(state): State<AppState>,
    Path((usecase, network, source, destination)): Path<(String, String, String, String)>,
    Query(filter): Query<DiffFilter>,
) -> Result<Json<SnapshotDiff>> {
    let diff = state
        .diff
        .diff_scaled(&usecase, &network, &source, &destination, &filter)
        .await?;
    Ok(Json(diff))
}
