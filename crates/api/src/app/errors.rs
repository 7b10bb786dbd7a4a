use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use grouppurge_infra::jobs::JobError;
use grouppurge_removal::WorkflowError;

pub fn job_error_to_response(err: JobError) -> axum::response::Response {
    match &err {
        JobError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
        JobError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        JobError::Conflict { .. } => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
    }
}

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::GroupNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "group_not_found", err.to_string())
        }
        WorkflowError::Storage(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_body(rejection: axum::extract::rejection::JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}
