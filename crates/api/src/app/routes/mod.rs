use axum::Router;
use axum::routing::{get, post};

pub mod sync_jobs;
pub mod system;
pub mod webhooks;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/webhooks/:channel", post(webhooks::receive))
        .route("/webhook-logs", get(webhooks::list_logs))
        .route("/webhook-logs/:id", get(webhooks::get_log))
        .route("/sync-jobs", get(sync_jobs::list))
        .route("/sync-jobs/stats", get(sync_jobs::stats))
        .route("/sync-jobs/:id", get(sync_jobs::get_job))
}
