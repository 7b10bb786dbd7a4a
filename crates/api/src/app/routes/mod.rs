use axum::Router;

pub mod jobs;
pub mod queue;
pub mod system;

/// Router for all job and queue endpoints.
pub fn router() -> Router {
    Router::new().merge(jobs::router()).merge(queue::router())
}
