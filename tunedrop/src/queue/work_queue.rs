//! FIFO buffer of pending jobs.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::job::Job;

/// Unbounded FIFO of pending jobs, safe for concurrent producers and
/// the worker-pool consumers. Workers are woken through [`Self::wait`]
/// when a job arrives.
pub struct WorkQueue {
    pending: Mutex<VecDeque<Job>>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Enqueue a job and wake one waiting worker.
    pub fn push(&self, job: Job) {
        self.pending.lock().push_back(job);
        self.notify.notify_one();
    }

    /// Claim the oldest pending job, if any.
    pub fn try_pop(&self) -> Option<Job> {
        self.pending.lock().pop_front()
    }

    /// Number of jobs still buffered.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Wait until a job is enqueued. Wakeups may be spurious or missed
    /// under bursts; callers pair this with a poll interval.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
