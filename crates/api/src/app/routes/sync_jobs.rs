use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, Query};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use stocklink_core::{BatchId, SyncJobId};
use stocklink_infra::audit_log::store::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use stocklink_infra::sync_jobs::SyncJobStatus;

use crate::app::errors;
use crate::app::services::AppServices;

#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    pub batch_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<JobQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref().map(str::parse::<SyncJobStatus>).transpose() {
        Ok(s) => s,
        Err(e) => return errors::bad_request("invalid_status", e.to_string()),
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let result = match query.batch_id {
        Some(raw) => {
            let batch_id: BatchId = match raw.parse() {
                Ok(b) => b,
                Err(e) => return errors::bad_request("invalid_batch_id", format!("{e}")),
            };
            services.sync_jobs.list_by_batch(batch_id).await.map(|jobs| {
                jobs.into_iter()
                    .filter(|j| status.is_none_or(|s| j.status == s))
                    .take(limit)
                    .collect::<Vec<_>>()
            })
        }
        None => services.sync_jobs.list_by_status(status, limit).await,
    };

    match result {
        Ok(items) => Json(json!({ "count": items.len(), "items": items })).into_response(),
        Err(e) => errors::sync_job_error_to_response(e),
    }
}

pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.sync_jobs.stats().await {
        Ok(stats) => Json(json!({
            "queued": stats.queued,
            "running": stats.running,
            "completed": stats.completed,
            "failed": stats.failed,
            "total": stats.total(),
        }))
        .into_response(),
        Err(e) => errors::sync_job_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SyncJobId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::bad_request("invalid_id", format!("{e}")),
    };

    match services.sync_jobs.get(id).await {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => errors::not_found(format!("sync job {id} not found")),
        Err(e) => errors::sync_job_error_to_response(e),
    }
}
