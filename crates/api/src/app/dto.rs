use serde::{Deserialize, Serialize};

use grouppurge_infra::jobs::{JobId, JobKind, JobRecord, JobStatus};
use grouppurge_removal::{HistoryEntry, QueueEntry, RemovalConfig};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    pub kind: JobKind,
    pub config: RemovalConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelJobQuery {
    /// Also forget the job record.
    #[serde(default)]
    pub purge: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateQueueRequest {
    pub whatsapp_ids: Vec<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobResponse {
    pub job_id: JobId,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelJobResponse {
    pub job_id: JobId,
    /// Absent when the record was purged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct QueueListResponse {
    pub entries: Vec<QueueEntry>,
}

#[derive(Debug, Serialize)]
pub struct HistoryListResponse {
    pub entries: Vec<HistoryEntry>,
}
