use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use stocklink_api::app::{build_app, services};
use stocklink_infra::AppConfig;
use stocklink_infra::workers::{EventWorker, log_channel_event};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stocklink_observability::init();

    let config = AppConfig::from_env().context("loading configuration")?;
    let services = Arc::new(
        services::build_services(&config)
            .await
            .context("wiring services")?,
    );

    let event_log = EventWorker::spawn("channel-event-log", &services.bus, log_channel_event)
        .context("spawning event log worker")?;

    let app = build_app(services.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;

    info!(
        address = %listener.local_addr()?,
        channels = ?services.channels(),
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    event_log.shutdown();
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
