//! REST API module.
//!
//! Provides HTTP endpoints for submitting downloads, polling job and
//! queue status, and browsing the library. No business logic lives
//! here; handlers validate input and delegate to the job queue.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
