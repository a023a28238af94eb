//! API route modules.
//!
//! Organizes routes by resource type.

pub mod downloads;
pub mod files;
pub mod health;
pub mod jobs;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/download", downloads::router())
        .nest("/api/jobs", jobs::router())
        .nest("/api/queue", jobs::queue_router())
        .nest("/api/files", files::router())
        .nest("/health", health::router())
        .with_state(state)
}
