//! Removal job endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use grouppurge_infra::jobs::{JobId, JobStatus};

use crate::app::dto::{
    CancelJobQuery, CancelJobResponse, JobListResponse, ListJobsQuery, StartJobRequest,
    StartJobResponse,
};
use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/jobs", get(list_jobs).post(start_job))
        .route("/jobs/:job_id", get(get_job).delete(cancel_job))
}

fn parse_job_id(raw: &str) -> Result<JobId, axum::response::Response> {
    raw.parse::<JobId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"))
}

/// POST /jobs
///
/// Start a removal job; returns as soon as it is running.
pub async fn start_job(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<StartJobRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::invalid_body(rejection),
    };

    match services.runner.start_job(req.kind, req.config) {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(StartJobResponse { job_id })).into_response(),
        Err(e) => errors::job_error_to_response(e),
    }
}

/// GET /jobs?status=running
pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListJobsQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref().map(str::parse::<JobStatus>).transpose() {
        Ok(status) => status,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_status", e.to_string()),
    };

    let jobs = services.runner.list_jobs(status);
    (StatusCode::OK, Json(JobListResponse { jobs })).into_response()
}

/// GET /jobs/:job_id
pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.runner.get_job_status(job_id) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::job_error_to_response(e),
    }
}

/// DELETE /jobs/:job_id[?purge=true]
///
/// Cancel a pending or running job. With `purge`, the record is forgotten
/// whatever its status.
pub async fn cancel_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
    Query(query): Query<CancelJobQuery>,
) -> axum::response::Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if query.purge {
        return match services.runner.delete_job(job_id) {
            Ok(()) => (
                StatusCode::OK,
                Json(CancelJobResponse {
                    job_id,
                    status: None,
                    message: "job deleted",
                }),
            )
                .into_response(),
            Err(e) => errors::job_error_to_response(e),
        };
    }

    match services.runner.cancel_job(job_id) {
        Ok(()) => {
            let status = services.runner.get_job_status(job_id).ok().map(|j| j.status);
            (
                StatusCode::OK,
                Json(CancelJobResponse {
                    job_id,
                    status,
                    message: "cancellation requested",
                }),
            )
                .into_response()
        }
        Err(e) => errors::job_error_to_response(e),
    }
}
