//! The three JSON endpoints of the instrumentation contract.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, info};

use memtap::types::{OpenProcessRequest, ProcessDescriptor, ServerInfo};

use crate::state::StubState;

pub fn router(state: StubState) -> Router {
    Router::new()
        .route("/serverinfo", get(server_info))
        .route("/enumprocess", get(enum_processes))
        .route("/openprocess", post(open_process))
        .with_state(state)
}

async fn server_info(State(state): State<StubState>) -> Json<ServerInfo> {
    debug!("serverinfo");
    Json(state.server_info())
}

async fn enum_processes(
    State(state): State<StubState>,
) -> Result<Json<Vec<ProcessDescriptor>>, StatusCode> {
    if state.failing_enum() {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    debug!(count = state.processes().len(), "enumprocess");
    Ok(Json(state.processes().to_vec()))
}

async fn open_process(
    State(state): State<StubState>,
    Json(req): Json<OpenProcessRequest>,
) -> StatusCode {
    state.record_open_call();
    if state.rejecting_open() {
        return StatusCode::FORBIDDEN;
    }
    if !state.processes().iter().any(|p| p.pid == req.pid) {
        return StatusCode::NOT_FOUND;
    }
    state.record_opened(req.pid);
    info!(pid = req.pid, "opened");
    StatusCode::OK
}
