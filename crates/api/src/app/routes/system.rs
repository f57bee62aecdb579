use std::sync::Arc;

use axum::extract::Extension;
use axum::response::IntoResponse;
use axum::Json;

use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "channels": services.channels(),
    }))
}
