//! Removal queue and history endpoints, per group.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use grouppurge_removal::{Group, RemovalPorts, WorkflowError, populate_queue};

use crate::app::dto::{HistoryListResponse, PopulateQueueRequest, QueueListResponse};
use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/groups/:group_id/queue", get(list_queue).post(populate))
        .route("/groups/:group_id/history", get(list_history))
}

async fn find_group(ports: &RemovalPorts, whatsapp_id: &str) -> Result<Group, WorkflowError> {
    ports
        .directory
        .find_group(whatsapp_id)
        .await?
        .ok_or_else(|| WorkflowError::GroupNotFound(whatsapp_id.to_string()))
}

/// POST /groups/:group_id/queue
///
/// Queue the given members for removal, skipping whitelisted ones.
pub async fn populate(
    Extension(services): Extension<Arc<AppServices>>,
    Path(group_id): Path<String>,
    body: Result<Json<PopulateQueueRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::invalid_body(rejection),
    };

    match populate_queue(&services.ports, &group_id, &req.whatsapp_ids).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

/// GET /groups/:group_id/queue
pub async fn list_queue(
    Extension(services): Extension<Arc<AppServices>>,
    Path(group_id): Path<String>,
) -> axum::response::Response {
    let result = async {
        let group = find_group(&services.ports, &group_id).await?;
        Ok::<_, WorkflowError>(services.ports.queue.list(group.id).await?)
    }
    .await;

    match result {
        Ok(entries) => (StatusCode::OK, Json(QueueListResponse { entries })).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

/// GET /groups/:group_id/history
pub async fn list_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(group_id): Path<String>,
) -> axum::response::Response {
    let result = async {
        let group = find_group(&services.ports, &group_id).await?;
        Ok::<_, WorkflowError>(services.ports.history.list(group.id).await?)
    }
    .await;

    match result {
        Ok(entries) => (StatusCode::OK, Json(HistoryListResponse { entries })).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
