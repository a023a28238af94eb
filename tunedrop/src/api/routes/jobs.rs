//! Job and queue status routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::queue::{QueueSnapshot, StatusRecord};

/// Create the jobs router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(job_status))
}

/// Create the queue status router.
pub fn queue_router() -> Router<AppState> {
    Router::new().route("/", get(queue_status))
}

/// Latest status record for one job.
async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusRecord>> {
    state
        .queue
        .status_of(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("unknown job id: {}", id)))
}

/// Point-in-time view of the queue and currently-processing jobs.
async fn queue_status(State(state): State<AppState>) -> Json<QueueSnapshot> {
    Json(state.queue.snapshot())
}
