use thiserror::Error;

use grouppurge_core::DomainError;

/// Failure of a single external removal call.
///
/// Always caught by the workflow and recorded against the batch; it never
/// aborts a job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoveCallError {
    #[error("removal rejected by platform: {0}")]
    Rejected(String),

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

/// Error escaping the workflow; the job that ran it ends as failed.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The target group cannot be resolved at all.
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// A storage collaborator failed outside the per-batch tolerance.
    #[error(transparent)]
    Storage(#[from] DomainError),
}
