//! Batch job progress.
//!
//! A job id is issued before a batch starts so a client can poll progress
//! while the batch runs. Progress is `Completed X of Y Total: Z%`; before the
//! first update it reads `Determining Progress...`. Closed or unknown jobs
//! report [`NO_PROGRESS`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Status text before the first progress update.
pub const DETERMINING_PROGRESS: &str = "Determining Progress...";

/// Reply for unknown or closed jobs.
pub const NO_PROGRESS: &str = "no progress available";

/// Opaque batch job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(format!("branchinherit-{}", Uuid::new_v4().simple()))
    }

    /// Wrap an id received from a client.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Progress of a running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Items finished.
    pub completed: usize,
    /// Items in the batch.
    pub total: usize,
    /// Human-readable status.
    pub status: String,
    /// Time of the last update.
    pub updated_at: DateTime<Utc>,
}

impl JobProgress {
    /// Progress of a job that has not reported yet.
    pub fn pending() -> Self {
        Self {
            completed: 0,
            total: 0,
            status: DETERMINING_PROGRESS.to_string(),
            updated_at: Utc::now(),
        }
    }

    /// Progress after `completed` of `total` items.
    pub fn new(completed: usize, total: usize) -> Self {
        let completed = completed.min(total);
        let percent = percent(completed, total);
        Self {
            completed,
            total,
            status: format!("Completed {} of {} Total: {}%", completed, total, percent),
            updated_at: Utc::now(),
        }
    }

    /// Whole-number percent complete. An empty batch is complete.
    pub fn percent(&self) -> usize {
        percent(self.completed, self.total)
    }

    /// Whether every item is done.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

fn percent(completed: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        completed * 100 / total
    }
}

/// Storage for job progress records.
pub trait ProgressStore: Send + Sync {
    /// Store or replace a record.
    fn put(&self, id: &JobId, progress: JobProgress);
    /// Fetch a record.
    fn get(&self, id: &JobId) -> Option<JobProgress>;
    /// Delete a record, returning it.
    fn remove(&self, id: &JobId) -> Option<JobProgress>;
}

/// Progress records held in memory.
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    records: RwLock<HashMap<JobId, JobProgress>>,
}

impl InMemoryProgressStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open jobs.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no jobs are open.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl ProgressStore for InMemoryProgressStore {
    fn put(&self, id: &JobId, progress: JobProgress) {
        self.records.write().insert(id.clone(), progress);
    }

    fn get(&self, id: &JobId) -> Option<JobProgress> {
        self.records.read().get(id).cloned()
    }

    fn remove(&self, id: &JobId) -> Option<JobProgress> {
        self.records.write().remove(id)
    }
}

/// Issues job ids and tracks their progress.
#[derive(Debug, Default)]
pub struct JobTracker<P: ProgressStore = InMemoryProgressStore> {
    store: P,
}

impl<P: ProgressStore> JobTracker<P> {
    /// Create a tracker over a progress store.
    pub fn new(store: P) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Issue a new job id in the pending state.
    pub fn new_job(&self) -> JobId {
        let id = JobId::generate();
        self.store.put(&id, JobProgress::pending());
        tracing::debug!(job_id = %id, "Opened job");
        id
    }

    /// Record progress for a job.
    pub fn update_progress(&self, id: &JobId, completed: usize, total: usize) {
        self.store.put(id, JobProgress::new(completed, total));
    }

    /// Current progress record.
    pub fn progress(&self, id: &JobId) -> Option<JobProgress> {
        self.store.get(id)
    }

    /// Current progress text, or [`NO_PROGRESS`].
    pub fn read_progress(&self, id: &JobId) -> String {
        self.store
            .get(id)
            .map(|p| p.status)
            .unwrap_or_else(|| NO_PROGRESS.to_string())
    }

    /// Close a job, returning its final progress.
    pub fn close_job(&self, id: &JobId) -> Option<JobProgress> {
        let last = self.store.remove(id);
        tracing::debug!(job_id = %id, "Closed job");
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_text() {
        assert_eq!(JobProgress::new(1, 3).status, "Completed 1 of 3 Total: 33%");
        assert_eq!(JobProgress::new(2, 2).status, "Completed 2 of 2 Total: 100%");
        assert_eq!(JobProgress::new(0, 0).percent(), 100);
    }

    #[test]
    fn test_job_lifecycle() {
        let tracker = JobTracker::<InMemoryProgressStore>::default();
        let id = tracker.new_job();
        assert!(id.as_str().starts_with("branchinherit-"));
        assert_eq!(tracker.read_progress(&id), DETERMINING_PROGRESS);

        tracker.update_progress(&id, 1, 4);
        assert_eq!(tracker.read_progress(&id), "Completed 1 of 4 Total: 25%");

        let last = tracker.close_job(&id).unwrap();
        assert_eq!(last.completed, 1);
        assert_eq!(tracker.read_progress(&id), NO_PROGRESS);
        assert!(tracker.store().is_empty());
    }

    #[test]
    fn test_unknown_job() {
        let tracker = JobTracker::<InMemoryProgressStore>::default();
        assert_eq!(tracker.read_progress(&JobId::from_string("nope")), NO_PROGRESS);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(JobId::generate(), JobId::generate());
    }
}
