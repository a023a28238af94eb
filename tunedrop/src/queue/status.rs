//! Shared status store for job progress.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use super::job::{JobState, QueueSnapshot, Stage, StatusRecord, TaggedStatus};

/// Partial update merged into a job's status record.
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    stage: Option<Stage>,
    state: Option<JobState>,
    message: Option<String>,
    error: Option<String>,
}

impl StatusPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Default)]
struct StoreState {
    records: HashMap<String, StatusRecord>,
    /// Ids claimed by a worker, in claim order.
    processing: Vec<String>,
}

/// Thread-safe map from job id to its latest progress record.
///
/// One mutex guards both the record map and the processing list, so a
/// snapshot never sees one without the other.
pub struct StatusStore {
    state: Mutex<StoreState>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Write the initial `queued` record for a freshly submitted job.
    pub fn insert_queued(&self, id: &str) {
        let mut state = self.state.lock();
        state.records.insert(id.to_string(), StatusRecord::queued());
    }

    /// Merge the given fields into a job's record, creating one if
    /// absent, and refresh its timestamp.
    pub fn update(&self, id: &str, patch: StatusPatch) {
        let mut state = self.state.lock();
        let record = state
            .records
            .entry(id.to_string())
            .or_insert_with(StatusRecord::queued);
        if let Some(stage) = patch.stage {
            record.stage = stage;
        }
        if let Some(job_state) = patch.state {
            record.state = job_state;
        }
        if let Some(message) = patch.message {
            record.message = Some(message);
        }
        if let Some(error) = patch.error {
            record.error = Some(error);
        }
        record.updated_at = Utc::now();
    }

    /// Point lookup; `None` signals an unknown (or evicted) job id.
    pub fn get(&self, id: &str) -> Option<StatusRecord> {
        self.state.lock().records.get(id).cloned()
    }

    /// Record that a worker claimed this job.
    pub fn mark_claimed(&self, id: &str) {
        let mut state = self.state.lock();
        if !state.processing.iter().any(|p| p == id) {
            state.processing.push(id.to_string());
        }
        let record = state
            .records
            .entry(id.to_string())
            .or_insert_with(StatusRecord::queued);
        record.state = JobState::Processing;
        record.updated_at = Utc::now();
    }

    /// Remove a job from the processing list once its worker is done
    /// with it, whatever the outcome.
    pub fn mark_unclaimed(&self, id: &str) {
        self.state.lock().processing.retain(|p| p != id);
    }

    /// Number of jobs currently claimed by a worker.
    pub fn processing_count(&self) -> usize {
        self.state.lock().processing.len()
    }

    /// Build a consistent snapshot of the processing set, paired with
    /// the caller-supplied queue length.
    pub fn snapshot(&self, queue_size: usize) -> QueueSnapshot {
        let state = self.state.lock();
        let current_jobs: Vec<TaggedStatus> = state
            .processing
            .iter()
            .filter_map(|id| {
                state.records.get(id).map(|record| TaggedStatus {
                    id: id.clone(),
                    record: record.clone(),
                })
            })
            .collect();
        QueueSnapshot {
            queue_size,
            current_job: current_jobs.first().cloned(),
            current_jobs,
        }
    }

    /// Remove every record older than `max_age`, except those still
    /// claimed by a worker. Returns the number of evicted records.
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();
        let mut state = self.state.lock();
        let before = state.records.len();
        let StoreState {
            records,
            processing,
        } = &mut *state;
        records.retain(|id, record| {
            processing.iter().any(|p| p == id)
                || now.signed_duration_since(record.updated_at) <= cutoff
        });
        before - state.records.len()
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle task bodies use to report stage transitions.
///
/// Every stage update flows through [`StatusStore::update`]; a reporter
/// created without a job id is a no-op, for invocations with no
/// queue-level identity.
#[derive(Clone)]
pub struct StageReporter {
    job_id: Option<String>,
    store: Arc<StatusStore>,
}

impl StageReporter {
    pub fn new(job_id: Option<String>, store: Arc<StatusStore>) -> Self {
        Self { job_id, store }
    }

    /// The job id updates are keyed by, if one was threaded in.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Apply a status patch under this reporter's job id.
    pub fn update(&self, patch: StatusPatch) {
        if let Some(id) = &self.job_id {
            self.store.update(id, patch);
        }
    }

    /// Report entering a stage with an activity message.
    pub fn stage(&self, stage: Stage, message: impl Into<String>) {
        self.update(StatusPatch::new().with_stage(stage).with_message(message));
    }
}
