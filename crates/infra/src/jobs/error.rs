use super::types::{JobId, JobStatus};

/// Errors returned by the job runner's operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// The job configuration was rejected; no job was created.
    #[error("invalid job configuration: {0}")]
    Validation(String),

    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The operation is not allowed in the job's current state.
    #[error("job {id} is already {status}")]
    Conflict { id: JobId, status: JobStatus },
}

impl JobError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
