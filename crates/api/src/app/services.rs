//! Infrastructure wiring: stores, event bus and the webhook processor.

use std::sync::Arc;

use tracing::{info, warn};

use stocklink_events::InMemoryEventBus;
use stocklink_infra::audit_log::{InMemoryWebhookLogStore, PostgresWebhookLogStore, WebhookLogStore};
use stocklink_infra::sync_jobs::{InMemorySyncJobStore, PostgresSyncJobStore, SyncJobStore};
use stocklink_infra::{AppConfig, WebhookProcessor, build_registry, schema};
use stocklink_inventory::{ChannelEvent, DriverRegistry};

pub type ChannelBus = Arc<InMemoryEventBus<ChannelEvent>>;
pub type LogStore = Arc<dyn WebhookLogStore>;
pub type JobStore = Arc<dyn SyncJobStore>;

const DB_MAX_CONNECTIONS: u32 = 10;

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub processor: WebhookProcessor<LogStore, ChannelBus>,
    pub webhook_logs: LogStore,
    pub sync_jobs: JobStore,
    pub bus: ChannelBus,
}

impl AppServices {
    pub fn new(registry: DriverRegistry, webhook_logs: LogStore, sync_jobs: JobStore) -> Self {
        let bus: ChannelBus = Arc::new(InMemoryEventBus::new());
        let processor = WebhookProcessor::new(Arc::new(registry), webhook_logs.clone(), bus.clone());
        Self {
            processor,
            webhook_logs,
            sync_jobs,
            bus,
        }
    }

    /// In-memory stores (dev/test).
    pub fn in_memory(registry: DriverRegistry) -> Self {
        Self::new(
            registry,
            Arc::new(InMemoryWebhookLogStore::new()),
            Arc::new(InMemorySyncJobStore::new()),
        )
    }

    pub fn channels(&self) -> Vec<String> {
        self.processor
            .registry()
            .channels()
            .map(|c| c.as_str().to_string())
            .collect()
    }
}

/// Wire services from configuration: Postgres when `DATABASE_URL` is set,
/// in-memory stores otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let registry = build_registry(&config.channels)?;
    if registry.is_empty() {
        warn!("no channels configured; every webhook will be dropped");
    }

    match &config.database_url {
        Some(url) => {
            let pool = schema::connect(url, DB_MAX_CONNECTIONS).await?;
            schema::ensure_schema(&pool).await?;
            info!("using postgres stores");
            Ok(AppServices::new(
                registry,
                Arc::new(PostgresWebhookLogStore::new(pool.clone())),
                Arc::new(PostgresSyncJobStore::new(pool)),
            ))
        }
        None => {
            warn!("DATABASE_URL not set; audit log and sync jobs are in-memory only");
            Ok(AppServices::in_memory(registry))
        }
    }
}
