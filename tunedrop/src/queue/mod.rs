//! Job queue engine for long-running download tasks.
//!
//! The engine is responsible for:
//! - Buffering submitted jobs in a FIFO work queue
//! - Running a fixed-size worker pool that executes task bodies
//! - Tracking per-job progress in a shared status store
//! - Age-based eviction of stale status records
//! - Best-effort, non-cancelling shutdown

mod engine;
mod evict;
mod job;
mod status;
mod work_queue;
mod worker_pool;

pub use engine::{JobQueue, QueueConfig};
pub use evict::EvictionConfig;
pub use job::{Job, JobState, QueueSnapshot, Stage, StatusRecord, TaggedStatus, TaskSpec};
pub use status::{StageReporter, StatusPatch, StatusStore};
pub use worker_pool::{TaskRunner, WorkerPool, WorkerPoolConfig};
