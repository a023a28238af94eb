//! Worker pool that drains the work queue.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::job::{JobState, Stage, TaskSpec};
use super::status::{StageReporter, StatusPatch, StatusStore};
use super::work_queue::WorkQueue;
use crate::Result;
use crate::pipeline::DownloadRequest;

/// Executes the task variants the queue accepts.
///
/// The worker loop owns the [`TaskSpec`] dispatch; implementations only
/// see the typed request for their variant. Fatal problems are returned
/// as errors and recorded against the job by the worker.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Run a download to completion.
    async fn download(&self, request: &DownloadRequest, reporter: &StageReporter) -> Result<()>;
}

/// Configuration for the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers (clamped to at least 1).
    pub worker_count: usize,
    /// How long a worker waits on an empty queue before re-checking the
    /// shutdown flag.
    pub poll_interval_ms: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            poll_interval_ms: 1000,
        }
    }
}

/// A fixed-size pool of workers sharing one work queue and one status
/// store.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    cancellation_token: CancellationToken,
    tasks: parking_lot::Mutex<Option<JoinSet<()>>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::with_config(WorkerPoolConfig::default())
    }

    pub fn with_config(config: WorkerPoolConfig) -> Self {
        Self {
            config,
            cancellation_token: CancellationToken::new(),
            tasks: parking_lot::Mutex::new(Some(JoinSet::new())),
        }
    }

    /// Spawn the worker loops.
    pub fn start(
        &self,
        queue: Arc<WorkQueue>,
        store: Arc<StatusStore>,
        runner: Arc<dyn TaskRunner>,
    ) {
        let worker_count = self.config.worker_count.max(1);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        info!("Starting worker pool with {} workers", worker_count);

        let mut tasks = self.tasks.lock();
        if let Some(ref mut join_set) = *tasks {
            for i in 0..worker_count {
                let cancellation_token = self.cancellation_token.clone();
                let queue = queue.clone();
                let store = store.clone();
                let runner = runner.clone();

                join_set.spawn(async move {
                    debug!("worker {} started", i);

                    loop {
                        if cancellation_token.is_cancelled() {
                            debug!("worker {} shutting down", i);
                            break;
                        }

                        // Wait for a job, a poll timeout, or shutdown.
                        tokio::select! {
                            _ = cancellation_token.cancelled() => break,
                            _ = queue.wait() => {}
                            _ = tokio::time::sleep(poll_interval) => {}
                        }

                        let Some(job) = queue.try_pop() else { continue };

                        store.mark_claimed(&job.id);
                        info!("worker {} processing job {} ({})", i, job.id, job.task.kind());

                        let reporter = StageReporter::new(
                            job.wants_own_id.then(|| job.id.clone()),
                            store.clone(),
                        );
                        let outcome = AssertUnwindSafe(async {
                            match &job.task {
                                TaskSpec::Download(request) => {
                                    runner.download(request, &reporter).await
                                }
                            }
                        })
                        .catch_unwind()
                        .await;

                        match outcome {
                            Ok(Ok(())) => {
                                store.update(
                                    &job.id,
                                    StatusPatch::new().with_state(JobState::Completed),
                                );
                                info!("job {} completed", job.id);
                            }
                            Ok(Err(e)) => {
                                store.update(
                                    &job.id,
                                    StatusPatch::new()
                                        .with_stage(Stage::Failed)
                                        .with_state(JobState::Failed)
                                        .with_error(e.to_string()),
                                );
                                warn!("job {} failed: {}", job.id, e);
                            }
                            Err(panic) => {
                                let message = panic_message(panic.as_ref());
                                store.update(
                                    &job.id,
                                    StatusPatch::new()
                                        .with_stage(Stage::Failed)
                                        .with_state(JobState::Failed)
                                        .with_error(format!("task panicked: {}", message)),
                                );
                                error!("job {} panicked: {}", job.id, message);
                            }
                        }

                        store.mark_unclaimed(&job.id);
                    }
                });
            }
        }
    }

    /// Stop the pool: flag shutdown, then wait up to `timeout` for the
    /// workers to notice and exit. Workers still inside a task body are
    /// detached rather than aborted so the job runs to completion.
    pub async fn stop(&self, timeout: Duration) {
        info!("Stopping worker pool");
        self.cancellation_token.cancel();

        let join_set = {
            let mut tasks = self.tasks.lock();
            tasks.take()
        };

        if let Some(mut join_set) = join_set {
            let drained = tokio::time::timeout(timeout, async {
                while join_set.join_next().await.is_some() {}
            })
            .await;

            if drained.is_err() {
                warn!(
                    "worker pool did not drain within {:?}; detaching remaining workers",
                    timeout
                );
                join_set.detach_all();
            }
        }

        info!("Worker pool stopped");
    }

    /// Whether the pool is accepting work.
    pub fn is_running(&self) -> bool {
        !self.cancellation_token.is_cancelled()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
