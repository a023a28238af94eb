//! tunedrop library crate.
//!
//! A small service that accepts music-download submissions over HTTP,
//! executes them asynchronously on a bounded worker pool, and exposes
//! point-in-time progress to polling clients.

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
