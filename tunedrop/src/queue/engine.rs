//! Queue facade tying the work queue, status store, and worker pool
//! together.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::evict::{EvictionConfig, spawn_eviction_task};
use super::job::{Job, QueueSnapshot, StatusRecord, TaskSpec};
use super::status::StatusStore;
use super::work_queue::WorkQueue;
use super::worker_pool::{TaskRunner, WorkerPool, WorkerPoolConfig};

/// Configuration for the job queue engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of concurrent workers (clamped to at least 1).
    pub worker_count: usize,
    /// Dequeue poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Status-record eviction settings.
    pub eviction: EvictionConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            poll_interval_ms: 1000,
            eviction: EvictionConfig::default(),
        }
    }
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_eviction(mut self, eviction: EvictionConfig) -> Self {
        self.eviction = eviction;
        self
    }
}

/// The job queue engine.
///
/// Single entry point for the rest of the system: submit a job, query
/// one job's status, query aggregate queue status, shut the engine
/// down. Built once by the composition root and injected wherever it is
/// needed.
pub struct JobQueue {
    work: Arc<WorkQueue>,
    store: Arc<StatusStore>,
    pool: WorkerPool,
    cancellation_token: CancellationToken,
}

impl JobQueue {
    /// Build the engine and start its workers and eviction timer.
    pub fn start(config: QueueConfig, runner: Arc<dyn TaskRunner>) -> Arc<Self> {
        let work = Arc::new(WorkQueue::new());
        let store = Arc::new(StatusStore::new());
        let pool = WorkerPool::with_config(WorkerPoolConfig {
            worker_count: config.worker_count,
            poll_interval_ms: config.poll_interval_ms,
        });
        pool.start(work.clone(), store.clone(), runner);

        let cancellation_token = CancellationToken::new();
        spawn_eviction_task(config.eviction, store.clone(), cancellation_token.clone());

        Arc::new(Self {
            work,
            store,
            pool,
            cancellation_token,
        })
    }

    /// Submit a task for execution, threading the job id into the task
    /// body so it can report progress.
    pub fn submit(&self, task: TaskSpec) -> String {
        self.submit_with(task, true)
    }

    /// Submit a task, choosing whether the task body receives the job
    /// id. The initial `queued` record is visible before this returns;
    /// execution happens on the pool and is never awaited here.
    pub fn submit_with(&self, task: TaskSpec, wants_own_id: bool) -> String {
        let job = Job::new(task, wants_own_id);
        let id = job.id.clone();
        let kind = job.task.kind();
        self.store.insert_queued(&id);
        self.work.push(job);
        info!("Enqueued {} job {}", kind, id);
        id
    }

    /// Latest status record for a job; `None` means unknown job id.
    pub fn status_of(&self, id: &str) -> Option<StatusRecord> {
        self.store.get(id)
    }

    /// Point-in-time view of the queue and the currently-processing
    /// jobs.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.store.snapshot(self.work.len())
    }

    /// Best-effort, non-cancelling shutdown: workers finish the job
    /// they already claimed; jobs still buffered are abandoned and
    /// their records stay `queued`.
    pub async fn shutdown(&self, timeout: Duration) {
        info!("Shutting down job queue");
        self.cancellation_token.cancel();
        self.pool.stop(timeout).await;

        let abandoned = self.work.len();
        if abandoned > 0 {
            warn!("{} queued jobs abandoned at shutdown", abandoned);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::pipeline::DownloadRequest;
    use crate::queue::job::{JobState, Stage};
    use crate::queue::status::StageReporter;
    use crate::{Error, Result};

    /// Task runner double: records processed urls and tracks the peak
    /// number of concurrent invocations. Urls containing "panic" panic,
    /// urls containing "fail" return an error.
    struct RecordingRunner {
        delay: Duration,
        seen: Mutex<Vec<String>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl RecordingRunner {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                seen: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TaskRunner for RecordingRunner {
        async fn download(
            &self,
            request: &DownloadRequest,
            _reporter: &StageReporter,
        ) -> Result<()> {
            if request.url.contains("panic") {
                panic!("injected panic");
            }
            if request.url.contains("fail") {
                return Err(Error::fetch("no result produced"));
            }
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.seen.lock().push(request.url.clone());
            Ok(())
        }
    }

    fn download(url: &str) -> TaskSpec {
        TaskSpec::Download(DownloadRequest::new(url))
    }

    fn test_config(workers: usize) -> QueueConfig {
        QueueConfig::new()
            .with_worker_count(workers)
            .with_poll_interval_ms(20)
    }

    async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = tokio::time::Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn initial_record_is_visible_before_submit_returns() {
        let runner = Arc::new(RecordingRunner::new(Duration::from_millis(50)));
        let queue = JobQueue::start(test_config(1), runner);

        let id = queue.submit(download("https://example.com/a"));
        let record = queue.status_of(&id).expect("record must exist immediately");
        assert!(matches!(record.state, JobState::Queued | JobState::Processing));

        queue.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn unknown_job_id_is_absent() {
        let runner = Arc::new(RecordingRunner::new(Duration::ZERO));
        let queue = JobQueue::start(test_config(1), runner);
        assert!(queue.status_of("no-such-job").is_none());
        queue.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn single_worker_processes_in_submission_order() {
        let runner = Arc::new(RecordingRunner::new(Duration::ZERO));
        let queue = JobQueue::start(test_config(1), runner.clone());

        let urls = [
            "https://example.com/1",
            "https://example.com/2",
            "https://example.com/3",
        ];
        let ids: Vec<String> = urls.iter().map(|u| queue.submit(download(u))).collect();

        let queue_ref = queue.clone();
        let done = wait_until(Duration::from_secs(5), move || {
            ids.iter().all(|id| {
                queue_ref
                    .status_of(id)
                    .is_some_and(|r| r.state == JobState::Completed)
            })
        })
        .await;
        assert!(done, "jobs did not complete in time");
        assert_eq!(*runner.seen.lock(), urls);

        queue.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn processing_never_exceeds_worker_count() {
        let runner = Arc::new(RecordingRunner::new(Duration::from_millis(80)));
        let queue = JobQueue::start(test_config(2), runner.clone());

        let ids: Vec<String> = (0..5)
            .map(|i| queue.submit(download(&format!("https://example.com/{}", i))))
            .collect();

        let queue_ref = queue.clone();
        let done = wait_until(Duration::from_secs(10), || {
            let snapshot = queue_ref.snapshot();
            assert!(
                snapshot.current_jobs.len() <= 2,
                "more than 2 jobs processing at once"
            );
            ids.iter().all(|id| {
                queue_ref
                    .status_of(id)
                    .is_some_and(|r| r.state == JobState::Completed)
            })
        })
        .await;
        assert!(done, "jobs did not complete in time");
        assert!(runner.max_active.load(Ordering::SeqCst) <= 2);

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.queue_size, 0);
        assert!(snapshot.current_jobs.is_empty());
        assert!(snapshot.current_job.is_none());

        queue.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn task_failure_is_recorded_and_queue_continues() {
        let runner = Arc::new(RecordingRunner::new(Duration::ZERO));
        let queue = JobQueue::start(test_config(1), runner);

        let failing = queue.submit(download("https://example.com/fail"));
        let ok = queue.submit(download("https://example.com/ok"));

        let queue_ref = queue.clone();
        let ok_ref = ok.clone();
        let done = wait_until(Duration::from_secs(5), move || {
            queue_ref
                .status_of(&ok_ref)
                .is_some_and(|r| r.state == JobState::Completed)
        })
        .await;
        assert!(done, "follow-up job did not complete");

        let record = queue.status_of(&failing).unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.stage, Stage::Failed);
        assert!(record.error.as_deref().is_some_and(|e| !e.is_empty()));

        queue.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn task_panic_does_not_kill_the_worker() {
        let runner = Arc::new(RecordingRunner::new(Duration::ZERO));
        let queue = JobQueue::start(test_config(1), runner);

        let panicking = queue.submit(download("https://example.com/panic"));
        let ok = queue.submit(download("https://example.com/ok"));

        let queue_ref = queue.clone();
        let ok_ref = ok.clone();
        let done = wait_until(Duration::from_secs(5), move || {
            queue_ref
                .status_of(&ok_ref)
                .is_some_and(|r| r.state == JobState::Completed)
        })
        .await;
        assert!(done, "worker died after panicking task");

        let record = queue.status_of(&panicking).unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert!(
            record
                .error
                .as_deref()
                .is_some_and(|e| e.contains("panicked"))
        );

        queue.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn terminal_state_does_not_change_afterwards() {
        let runner = Arc::new(RecordingRunner::new(Duration::ZERO));
        let queue = JobQueue::start(test_config(1), runner);

        let id = queue.submit(download("https://example.com/a"));
        let queue_ref = queue.clone();
        let id_ref = id.clone();
        assert!(
            wait_until(Duration::from_secs(5), move || {
                queue_ref
                    .status_of(&id_ref)
                    .is_some_and(|r| r.state == JobState::Completed)
            })
            .await
        );

        let before = queue.status_of(&id).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let after = queue.status_of(&id).unwrap();
        assert_eq!(after.state, before.state);
        assert_eq!(after.stage, before.stage);
        assert_eq!(after.updated_at, before.updated_at);

        queue.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn shutdown_abandons_buffered_jobs() {
        let runner = Arc::new(RecordingRunner::new(Duration::from_millis(200)));
        let queue = JobQueue::start(test_config(1), runner);

        let first = queue.submit(download("https://example.com/1"));
        let second = queue.submit(download("https://example.com/2"));
        let third = queue.submit(download("https://example.com/3"));

        // Wait for the first job to be claimed, then shut down.
        let queue_ref = queue.clone();
        let first_ref = first.clone();
        assert!(
            wait_until(Duration::from_secs(5), move || {
                queue_ref
                    .status_of(&first_ref)
                    .is_some_and(|r| r.state != JobState::Queued)
            })
            .await
        );
        queue.shutdown(Duration::from_secs(2)).await;

        // The claimed job ran to completion; the rest stay queued.
        assert_eq!(queue.status_of(&first).unwrap().state, JobState::Completed);
        assert_eq!(queue.status_of(&second).unwrap().state, JobState::Queued);
        assert_eq!(queue.status_of(&third).unwrap().state, JobState::Queued);
        assert_eq!(queue.snapshot().queue_size, 2);
    }
}
