//! Download submission route.

use axum::{Json, Router, extract::State, routing::post};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{DownloadSubmission, SubmissionResponse};
use crate::api::server::AppState;
use crate::pipeline::DownloadRequest;
use crate::queue::TaskSpec;

/// Create the downloads router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(submit_download))
}

/// Accept a download submission and enqueue it.
///
/// Returns the job id immediately; execution happens on the worker
/// pool and progress is polled via `/api/jobs/{id}`.
async fn submit_download(
    State(state): State<AppState>,
    Json(submission): Json<DownloadSubmission>,
) -> ApiResult<Json<SubmissionResponse>> {
    let url = submission.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("url is required"));
    }

    let job_id = state
        .queue
        .submit(TaskSpec::Download(DownloadRequest::new(url)));
    info!("Accepted download of {} as job {}", url, job_id);

    Ok(Json(SubmissionResponse { job_id }))
}
