//! Axum router and service wiring.
//!
//! - `services.rs`: store/bus/processor wiring (Postgres or in-memory)
//! - `routes/`: handlers, one file per area
//! - `errors.rs`: JSON error responses

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{Extension, Router};
use tower::ServiceBuilder;

pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Largest webhook body that is read. Bigger bodies are acknowledged and
/// dropped with a warning.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Build the full HTTP router (used by `main.rs` and the black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    build_app_with_body_limit(services, MAX_BODY_BYTES)
}

pub fn build_app_with_body_limit(services: Arc<AppServices>, max_body_bytes: usize) -> Router {
    routes::router().layer(
        ServiceBuilder::new()
            .layer(DefaultBodyLimit::max(max_body_bytes))
            .layer(Extension(services)),
    )
}
