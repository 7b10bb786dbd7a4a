//! Core job types and lifecycle transitions.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use grouppurge_core::{DomainError, ProgressUpdate};
use grouppurge_removal::{RemovalConfig, WorkflowMode};

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s)
            .map(Self)
            .map_err(|e| DomainError::invalid_id(format!("JobId: {e}")))
    }
}

/// Which workflow a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Sync inactive members into the removal queue, then remove them.
    RemovalWorkflow,
    /// Remove what is already queued.
    RemovalQueueOnly,
}

impl JobKind {
    pub fn mode(&self) -> WorkflowMode {
        match self {
            JobKind::RemovalWorkflow => WorkflowMode::SyncAndRemove,
            JobKind::RemovalQueueOnly => WorkflowMode::RemoveOnly,
        }
    }

    pub fn requires_sync(&self) -> bool {
        matches!(self, JobKind::RemovalWorkflow)
    }
}

/// Job execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, workflow not started yet
    Pending,
    /// Workflow is executing
    Running,
    /// Workflow returned normally without being cancelled
    Completed,
    /// Cancelled by request
    Cancelled,
    /// Workflow returned an error
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DomainError::validation(format!("unknown job status: {other}"))),
        }
    }
}

/// Progress summary of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub processed: u64,
    pub total: Option<u64>,
    pub current_batch: Option<u32>,
    /// Describes the last completed step.
    pub message: Option<String>,
}

impl JobProgress {
    /// Merge the fields present in `update`, leaving the others untouched.
    ///
    /// `processed` never decreases; a lower value is ignored.
    pub fn merge(&mut self, update: ProgressUpdate) {
        if let Some(processed) = update.processed {
            self.processed = self.processed.max(processed);
        }
        if let Some(total) = update.total {
            self.total = Some(total);
        }
        if let Some(batch) = update.current_batch {
            self.current_batch = Some(batch);
        }
        if let Some(message) = update.message {
            self.message = Some(message);
        }
    }
}

/// Terminal result of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutcome {
    /// External ids actually removed (also set for cancelled jobs).
    #[serde(rename_all = "camelCase")]
    Removed { removed_whatsapp_ids: Vec<String> },
    Error { error: String },
}

impl JobOutcome {
    pub fn removed(ids: Vec<String>) -> Self {
        Self::Removed {
            removed_whatsapp_ids: ids,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn removed_ids(&self) -> &[String] {
        match self {
            JobOutcome::Removed {
                removed_whatsapp_ids,
            } => removed_whatsapp_ids,
            JobOutcome::Error { .. } => &[],
        }
    }
}

/// A tracked background removal job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Snapshot taken at creation; never mutated.
    pub config: RemovalConfig,
    pub progress: JobProgress,
    pub result: Option<JobOutcome>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub cancellation: CancellationToken,
}

impl JobRecord {
    /// Create a pending job with a fresh cancellation token.
    pub fn new(kind: JobKind, config: RemovalConfig) -> Self {
        Self {
            id: JobId::new(),
            kind,
            status: JobStatus::Pending,
            config,
            progress: JobProgress::default(),
            result: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next` if the lifecycle allows it, stamping timestamps.
    ///
    /// Returns `false` (and changes nothing) for a disallowed transition.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }

        let now = Utc::now();
        if next == JobStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = next;
        true
    }
}
