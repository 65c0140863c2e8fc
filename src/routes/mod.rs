// HTTP routes

mod error;
mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::diff::DiffEngine;
use crate::sampling::SamplingMachine;
use crate::store::SamplingRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) sampling: Arc<SamplingMachine>,
    pub(crate) diff: Arc<DiffEngine>,
    pub(crate) repo: Arc<SamplingRepo>,
}

pub fn app(
    sampling: Arc<SamplingMachine>,
    diff: Arc<DiffEngine>,
    repo: Arc<SamplingRepo>,
) -> Router {
    let state = AppState {
        sampling,
        diff,
        repo,
    };
    Router::new()
        .route("/", get(|| async { "state-conductor" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(
            "/state-conductor/environment/{network}/{snapshot}/sampling",
            get(http::get_sampling).post(http::post_sampling),
        ) // GET, POST sampling
        .route(
            "/state-conductor/environment/{network}/{snapshot}/state",
            get(http::get_state),
        ) // GET captured statistics
        .route(
            "/state-conductor/environment/{network}/{snapshot}/diff",
            get(http::get_baseline_diff),
        ) // GET diff against baseline
        .route(
            "/state-conductor/environment/{network}/snapshots",
            get(http::list_snapshots),
        ) // GET captured snapshot names
        .route(
            "/state-conductor/usecase/{usecase}/{network}/{source}/{destination}/diff",
            get(http::get_scaled_diff),
        ) // GET scaled diff, ?node=&interface=
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
