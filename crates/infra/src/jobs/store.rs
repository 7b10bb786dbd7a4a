//! Job storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use grouppurge_core::ProgressUpdate;
use grouppurge_removal::RemovalConfig;

use super::types::{JobId, JobKind, JobOutcome, JobRecord, JobStatus};

/// Default time a finished job stays visible before it is reaped.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Job store abstraction.
///
/// Every method is atomic with respect to the others and infallible; unknown
/// ids are a no-op (or `None`/`false`).
pub trait JobStore: Send + Sync {
    /// Register a new pending job with a fresh cancellation token.
    fn create(&self, kind: JobKind, config: RemovalConfig) -> JobRecord;

    /// Snapshot of a job.
    fn get(&self, id: JobId) -> Option<JobRecord>;

    /// Jobs in creation order, optionally filtered by status.
    fn list(&self, status: Option<JobStatus>) -> Vec<JobRecord>;

    /// Apply a lifecycle transition. Returns `false` if the job is unknown or
    /// the transition is not allowed.
    fn set_status(&self, id: JobId, status: JobStatus) -> bool;

    /// Merge a partial progress update.
    fn merge_progress(&self, id: JobId, update: ProgressUpdate);

    /// Replace the job's result.
    fn set_result(&self, id: JobId, result: JobOutcome);

    /// Trigger the job's token and mark it cancelled.
    ///
    /// Returns `false` if the job is unknown or already terminal.
    fn request_cancel(&self, id: JobId) -> bool;

    /// Remove a job regardless of status.
    fn delete(&self, id: JobId) -> bool;

    /// Remove terminal jobs that completed before `cutoff`. Returns how many
    /// were removed.
    fn reap_before(&self, cutoff: DateTime<Utc>) -> usize;

    /// Remove terminal jobs that completed more than `retention` ago.
    fn reap(&self, retention: Duration) -> usize {
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.reap_before(cutoff)
    }
}

/// In-memory job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<Jobs>,
}

#[derive(Debug, Default)]
struct Jobs {
    by_id: HashMap<JobId, JobRecord>,
    /// Ids in creation order.
    order: Vec<JobId>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // Mutations under the guard are single assignments; a poisoned lock still
    // holds consistent records.
    fn read(&self) -> RwLockReadGuard<'_, Jobs> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Jobs> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, kind: JobKind, config: RemovalConfig) -> JobRecord {
        let record = JobRecord::new(kind, config);
        let mut jobs = self.write();
        jobs.order.push(record.id);
        jobs.by_id.insert(record.id, record.clone());
        record
    }

    fn get(&self, id: JobId) -> Option<JobRecord> {
        self.read().by_id.get(&id).cloned()
    }

    fn list(&self, status: Option<JobStatus>) -> Vec<JobRecord> {
        let jobs = self.read();
        jobs.order
            .iter()
            .filter_map(|id| jobs.by_id.get(id))
            .filter(|j| status.is_none_or(|s| j.status == s))
            .cloned()
            .collect()
    }

    fn set_status(&self, id: JobId, status: JobStatus) -> bool {
        let mut jobs = self.write();
        let Some(job) = jobs.by_id.get_mut(&id) else {
            return false;
        };

        let from = job.status;
        let applied = job.transition(status);
        if !applied {
            debug!(job_id = %id, from = %from, to = %status, "ignored job status transition");
        }
        applied
    }

    fn merge_progress(&self, id: JobId, update: ProgressUpdate) {
        if let Some(job) = self.write().by_id.get_mut(&id) {
            job.progress.merge(update);
        }
    }

    fn set_result(&self, id: JobId, result: JobOutcome) {
        if let Some(job) = self.write().by_id.get_mut(&id) {
            job.result = Some(result);
        }
    }

    fn request_cancel(&self, id: JobId) -> bool {
        let mut jobs = self.write();
        let Some(job) = jobs.by_id.get_mut(&id) else {
            return false;
        };
        if job.is_terminal() {
            return false;
        }

        job.cancellation.cancel();
        job.transition(JobStatus::Cancelled)
    }

    fn delete(&self, id: JobId) -> bool {
        let mut jobs = self.write();
        let removed = jobs.by_id.remove(&id).is_some();
        if removed {
            jobs.order.retain(|o| *o != id);
        }
        removed
    }

    fn reap_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut guard = self.write();
        let jobs = &mut *guard;
        let before = jobs.by_id.len();
        jobs.by_id.retain(|_, job| {
            !(job.is_terminal() && job.completed_at.is_some_and(|at| at < cutoff))
        });
        let by_id = &jobs.by_id;
        jobs.order.retain(|id| by_id.contains_key(id));
        before - jobs.by_id.len()
    }
}

impl JobStore for Arc<InMemoryJobStore> {
    fn create(&self, kind: JobKind, config: RemovalConfig) -> JobRecord {
        (**self).create(kind, config)
    }

    fn get(&self, id: JobId) -> Option<JobRecord> {
        (**self).get(id)
    }

    fn list(&self, status: Option<JobStatus>) -> Vec<JobRecord> {
        (**self).list(status)
    }

    fn set_status(&self, id: JobId, status: JobStatus) -> bool {
        (**self).set_status(id, status)
    }

    fn merge_progress(&self, id: JobId, update: ProgressUpdate) {
        (**self).merge_progress(id, update)
    }

    fn set_result(&self, id: JobId, result: JobOutcome) {
        (**self).set_result(id, result)
    }

    fn request_cancel(&self, id: JobId) -> bool {
        (**self).request_cancel(id)
    }

    fn delete(&self, id: JobId) -> bool {
        (**self).delete(id)
    }

    fn reap_before(&self, cutoff: DateTime<Utc>) -> usize {
        (**self).reap_before(cutoff)
    }
}
