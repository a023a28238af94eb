//! API request and response models.

use serde::{Deserialize, Serialize};

/// Body of a download submission.
#[derive(Debug, Deserialize)]
pub struct DownloadSubmission {
    /// URL to fetch. Validated here; the queue performs no input
    /// validation of its own.
    #[serde(default)]
    pub url: String,
}

/// Response to an accepted download submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    /// Id to poll job status with.
    pub job_id: String,
}

/// Library file listing.
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    /// Relative paths under the library directory, sorted.
    pub files: Vec<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
