use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use stocklink_core::{ChannelName, WebhookLogId};
use stocklink_infra::audit_log::{WebhookLogFilter, WebhookLogStatus};
use stocklink_inventory::WebhookRequest;

use crate::app::errors;
use crate::app::services::AppServices;

/// Webhook intake. Always acknowledges: processing outcomes live in the
/// audit log, and a non-2xx answer would only make the channel redeliver.
/// A body that cannot be read (over the size limit) is logged and dropped.
pub async fn receive(
    Extension(services): Extension<Arc<AppServices>>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                channel = %channel,
                status = %rejection.status(),
                error = %rejection.body_text(),
                "webhook body unreadable; acknowledged without processing"
            );
            return (StatusCode::OK, Json(json!({ "status": "dropped" })));
        }
    };

    let request = WebhookRequest::new(
        body.to_vec(),
        headers.iter().map(|(name, value)| {
            (
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        }),
    );

    services.processor.process(&channel, &request).await;

    (StatusCode::OK, Json(json!({ "status": "received" })))
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub channel: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

impl LogQuery {
    fn into_filter(self) -> Result<WebhookLogFilter, axum::response::Response> {
        let channel = self
            .channel
            .map(|raw| ChannelName::parse(&raw))
            .transpose()
            .map_err(|e| errors::bad_request("invalid_channel", e.to_string()))?;
        let status = self
            .status
            .map(|raw| raw.parse::<WebhookLogStatus>())
            .transpose()
            .map_err(|e| errors::bad_request("invalid_status", e.to_string()))?;
        Ok(WebhookLogFilter {
            channel,
            status,
            limit: self.limit,
        })
    }
}

pub async fn list_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<LogQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.webhook_logs.list(&filter).await {
        Ok(items) => Json(json!({ "count": items.len(), "items": items })).into_response(),
        Err(e) => errors::log_store_error_to_response(e),
    }
}

pub async fn get_log(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: WebhookLogId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::bad_request("invalid_id", format!("{e}")),
    };

    match services.webhook_logs.get(id).await {
        Ok(Some(log)) => Json(log).into_response(),
        Ok(None) => errors::not_found(format!("webhook log {id} not found")),
        Err(e) => errors::log_store_error_to_response(e),
    }
}
