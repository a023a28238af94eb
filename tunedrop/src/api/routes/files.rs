//! Library browsing route.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::FileListResponse;
use crate::api::server::AppState;
use crate::pipeline::fetcher::collect_files;

/// Create the files router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_files))
}

/// List every file in the library, as sorted relative paths.
async fn list_files(State(state): State<AppState>) -> ApiResult<Json<FileListResponse>> {
    if !matches!(tokio::fs::try_exists(&state.library_dir).await, Ok(true)) {
        return Ok(Json(FileListResponse { files: Vec::new() }));
    }

    let files = collect_files(&state.library_dir)
        .await
        .map_err(|e| ApiError::internal(format!("failed to read library: {}", e)))?
        .into_iter()
        .filter_map(|path| {
            path.strip_prefix(&state.library_dir)
                .ok()
                .map(|relative| relative.to_string_lossy().into_owned())
        })
        .collect();

    Ok(Json(FileListResponse { files }))
}
