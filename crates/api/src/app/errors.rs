use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stocklink_infra::audit_log::WebhookLogStoreError;
use stocklink_infra::sync_jobs::SyncJobStoreError;

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

pub fn not_found(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn bad_request(code: &'static str, message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, code, message)
}

pub fn log_store_error_to_response(err: WebhookLogStoreError) -> axum::response::Response {
    match err {
        WebhookLogStoreError::NotFound(id) => not_found(format!("webhook log {id} not found")),
        e @ WebhookLogStoreError::AlreadyTerminal { .. } => {
            json_error(StatusCode::CONFLICT, "conflict", e.to_string())
        }
        WebhookLogStoreError::Storage(msg) => {
            tracing::error!(error = %msg, "webhook log store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn sync_job_error_to_response(err: SyncJobStoreError) -> axum::response::Response {
    match err {
        SyncJobStoreError::NotFound(id) => not_found(format!("sync job {id} not found")),
        e @ (SyncJobStoreError::AlreadyExists(_) | SyncJobStoreError::Conflict { .. }) => {
            json_error(StatusCode::CONFLICT, "conflict", e.to_string())
        }
        SyncJobStoreError::Invalid(e) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", e.to_string())
        }
        SyncJobStoreError::Storage(msg) => {
            tracing::error!(error = %msg, "sync job store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}
