//! Job runner: validates requests, launches workflows on tokio tasks and
//! writes their outcome back into the job store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use grouppurge_core::ProgressFn;
use grouppurge_removal::{RemovalConfig, RemovalWorkflow, inactivity_cutoff};

use super::error::JobError;
use super::store::JobStore;
use super::types::{JobId, JobKind, JobOutcome, JobRecord, JobStatus};

/// Limits applied to every job request.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Smallest pause allowed between batches (platform rate limit).
    pub min_delay: Duration,
    pub max_batch_size: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1_000),
            max_batch_size: 100,
        }
    }
}

impl RunnerConfig {
    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }
}

/// Starts and tracks removal jobs.
///
/// Each job runs as an independent tokio task; the store is the only state
/// shared between jobs.
#[derive(Clone)]
pub struct JobRunner<S: JobStore> {
    store: S,
    workflow: RemovalWorkflow,
    config: RunnerConfig,
}

impl<S: JobStore + Clone + 'static> JobRunner<S> {
    pub fn new(store: S, workflow: RemovalWorkflow, config: RunnerConfig) -> Self {
        Self {
            store,
            workflow,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn workflow(&self) -> &RemovalWorkflow {
        &self.workflow
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Check a job request against the runner's limits.
    pub fn validate(&self, kind: JobKind, config: &RemovalConfig) -> Result<(), JobError> {
        if config.group_id.trim().is_empty() {
            return Err(JobError::validation("groupId must not be blank"));
        }

        let max = self.config.max_batch_size;
        if config.batch_size == 0 || config.batch_size > max {
            return Err(JobError::validation(format!(
                "batchSize must be between 1 and {max}, got {}",
                config.batch_size
            )));
        }

        if config.delay().is_zero() || config.delay() < self.config.min_delay {
            return Err(JobError::validation(format!(
                "delayMs must be at least {}, got {}",
                self.config.min_delay.as_millis(),
                config.delay_ms
            )));
        }

        if kind.requires_sync() {
            match config.inactivity_window() {
                Some(w) if !w.is_zero() => {
                    if inactivity_cutoff(Utc::now(), w).is_none() {
                        return Err(JobError::validation(format!(
                            "inactivityWindowMs {} is out of range",
                            w.as_millis()
                        )));
                    }
                }
                _ => {
                    return Err(JobError::validation(
                        "inactivityWindowMs must be positive for removal_workflow jobs",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Validate, register and launch a job. Returns as soon as the job task is
    /// spawned.
    pub fn start_job(&self, kind: JobKind, config: RemovalConfig) -> Result<JobId, JobError> {
        self.validate(kind, &config)?;

        let record = self.store.create(kind, config);
        let id = record.id;
        self.store.set_status(id, JobStatus::Running);

        let span = info_span!("removal_job", job_id = %id, kind = ?kind, group = %record.config.group_id);
        let task = run_job(self.store.clone(), self.workflow.clone(), record);
        tokio::spawn(task.instrument(span));

        info!(job_id = %id, kind = ?kind, "job started");
        Ok(id)
    }

    pub fn get_job_status(&self, id: JobId) -> Result<JobRecord, JobError> {
        self.store.get(id).ok_or(JobError::NotFound(id))
    }

    /// Request cooperative cancellation of a pending or running job.
    pub fn cancel_job(&self, id: JobId) -> Result<(), JobError> {
        if self.store.request_cancel(id) {
            info!(job_id = %id, "job cancellation requested");
            return Ok(());
        }

        match self.store.get(id) {
            None => Err(JobError::NotFound(id)),
            Some(job) => Err(JobError::Conflict {
                id,
                status: job.status,
            }),
        }
    }

    pub fn list_jobs(&self, status: Option<JobStatus>) -> Vec<JobRecord> {
        self.store.list(status)
    }

    /// Forget a job. A job still running is cancelled first.
    pub fn delete_job(&self, id: JobId) -> Result<(), JobError> {
        let job = self.store.get(id).ok_or(JobError::NotFound(id))?;
        job.cancellation.cancel();
        if !self.store.delete(id) {
            return Err(JobError::NotFound(id));
        }
        info!(job_id = %id, status = %job.status, "job deleted");
        Ok(())
    }
}

async fn run_job<S: JobStore + Clone + 'static>(store: S, workflow: RemovalWorkflow, record: JobRecord) {
    let id = record.id;
    let cancel: CancellationToken = record.cancellation.clone();
    let progress: ProgressFn = {
        let store = store.clone();
        Arc::new(move |update| store.merge_progress(id, update))
    };

    // The workflow gets its own task so a panic inside it still fails the job.
    let mode = record.kind.mode();
    let config = record.config;
    let token = cancel.clone();
    let outcome = tokio::spawn(
        async move { workflow.run(mode, &config, &token, &progress).await }.in_current_span(),
    )
    .await;

    match outcome {
        Ok(Ok(summary)) => {
            let removed = summary.removed_whatsapp_ids.len();
            store.set_result(id, JobOutcome::removed(summary.removed_whatsapp_ids));
            if cancel.is_cancelled() {
                store.set_status(id, JobStatus::Cancelled);
                info!(processed = summary.processed, removed, "job cancelled");
            } else {
                store.set_status(id, JobStatus::Completed);
                info!(
                    processed = summary.processed,
                    removed,
                    failed_batches = summary.failed_batches,
                    "job completed"
                );
            }
        }
        Ok(Err(e)) => {
            error!(error = %e, "job failed");
            store.set_result(id, JobOutcome::error(e.to_string()));
            store.set_status(id, JobStatus::Failed);
        }
        Err(join) => {
            warn!(error = %join, "job task aborted");
            store.set_result(id, JobOutcome::error(format!("unexpected error: {join}")));
            store.set_status(id, JobStatus::Failed);
        }
    }
}
