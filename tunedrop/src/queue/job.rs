//! Job descriptors and status records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::DownloadRequest;

/// Pipeline stage a job is currently in.
///
/// `Queued` is the queue-lifecycle value written at submission; the
/// remaining variants are reported by the download pipeline as it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    ResolvingUrl,
    Downloading,
    Postprocessing,
    BeetsImport,
    MovingFiles,
    Done,
    Failed,
}

impl Stage {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::ResolvingUrl => "resolving_url",
            Self::Downloading => "downloading",
            Self::Postprocessing => "postprocessing",
            Self::BeetsImport => "beets_import",
            Self::MovingFiles => "moving_files",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse lifecycle state of a job, updated alongside `Stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Job is buffered and waiting for a worker.
    Queued,
    /// Job has been claimed by a worker.
    Processing,
    /// Job finished successfully.
    Completed,
    /// Job failed.
    Failed,
}

impl JobState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// The closed set of work the queue knows how to execute.
///
/// New task kinds become new variants dispatched by the worker loop.
#[derive(Debug, Clone)]
pub enum TaskSpec {
    /// Fetch a piece of music and integrate it into the library.
    Download(DownloadRequest),
}

impl TaskSpec {
    /// Short name of the task kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Download(_) => "download",
        }
    }
}

/// A submitted unit of work, owned by the work queue until a worker
/// claims it, then by that worker for the duration of execution.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job id.
    pub id: String,
    /// What to execute.
    pub task: TaskSpec,
    /// Pass the job id into the task body so it can report stage
    /// transitions under its own id.
    pub wants_own_id: bool,
    /// When the job was submitted.
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job with a fresh id.
    pub fn new(task: TaskSpec, wants_own_id: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task,
            wants_own_id,
            submitted_at: Utc::now(),
        }
    }
}

/// Point-in-time progress record for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Current pipeline stage.
    pub stage: Stage,
    /// Current lifecycle state.
    pub state: JobState,
    /// Human-readable current activity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error detail, present only for failed jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Last update time; refreshed on every mutation and drives eviction.
    pub updated_at: DateTime<Utc>,
}

impl StatusRecord {
    /// The initial record written at submission time.
    pub fn queued() -> Self {
        Self {
            stage: Stage::Queued,
            state: JobState::Queued,
            message: None,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

/// A status record tagged with its job id.
#[derive(Debug, Clone, Serialize)]
pub struct TaggedStatus {
    pub id: String,
    #[serde(flatten)]
    pub record: StatusRecord,
}

/// Derived view of the queue, computed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    /// Number of jobs still buffered in the work queue.
    pub queue_size: usize,
    /// The first currently-processing job, if any.
    pub current_job: Option<TaggedStatus>,
    /// Every currently-processing job, in claim order.
    pub current_jobs: Vec<TaggedStatus>,
}
