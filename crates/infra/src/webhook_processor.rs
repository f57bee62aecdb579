//! Webhook ingestion: driver dispatch, audit trail and event derivation.
//!
//! For one inbound request, in order:
//!
//! 1. resolve the channel's driver (failure: log only, no audit row)
//! 2. extract the topic and capture body/headers as-is
//! 3. insert a `pending` audit row
//! 4. publish `WebhookReceived` (decoded body, or an empty mapping)
//! 5. parse the body into an [`UpdatePayload`](stocklink_inventory::UpdatePayload)
//! 6. fetch the current product for the parsed remote id
//! 7. publish `InventoryUpdated` with the fetched quantity as "previous"
//! 8. mark the row `processed`
//!
//! Any failure in 5-7 marks the row `failed` with the error's message. The
//! caller never sees an error: the transport layer acknowledges regardless.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use stocklink_core::{ChannelName, WebhookLogId};
use stocklink_events::{Event, EventBus};
use stocklink_inventory::{
    ChannelEvent, DriverError, DriverNotFound, DriverRegistry, InventoryDriver, InventoryUpdated,
    RemoteId, WebhookReceived, WebhookRequest,
};

use crate::audit_log::{
    NewWebhookLog, RawPayload, WebhookLogStore, WebhookLogStoreError, WebhookOutcome,
};

/// Why a request's processing stopped early.
///
/// Everything except `DriverNotFound` and a failing audit store ends up as the
/// audit row's failure detail (its `Display` output).
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    DriverNotFound(#[from] DriverNotFound),

    #[error("{0}")]
    PayloadParse(DriverError),

    #[error("unable to fetch product details for remote id {remote_id}: {source}")]
    ProductFetch {
        remote_id: RemoteId,
        #[source]
        source: DriverError,
    },

    #[error("unable to publish {event_type}: {reason}")]
    Publish {
        event_type: &'static str,
        reason: String,
    },

    #[error("audit log: {0}")]
    AuditLog(#[from] WebhookLogStoreError),
}

/// Orchestrates a single webhook from dispatch to terminal audit status.
///
/// All collaborators are injected; the processor holds no per-request state
/// and can be shared across concurrent requests.
pub struct WebhookProcessor<L, B> {
    registry: Arc<DriverRegistry>,
    log_store: L,
    bus: B,
}

impl<L, B> WebhookProcessor<L, B>
where
    L: WebhookLogStore,
    B: EventBus<ChannelEvent>,
{
    pub fn new(registry: Arc<DriverRegistry>, log_store: L, bus: B) -> Self {
        Self {
            registry,
            log_store,
            bus,
        }
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    pub fn log_store(&self) -> &L {
        &self.log_store
    }

    /// Process one inbound webhook. Never fails; outcomes go to the audit log
    /// and the tracing subscriber.
    #[instrument(skip(self, request), fields(body_len = request.body().len()))]
    pub async fn process(&self, channel: &str, request: &WebhookRequest) {
        if let Err(err) = self.try_process(channel, request).await {
            error!(channel, error = %err, "webhook dropped");
        }
    }

    async fn try_process(
        &self,
        channel: &str,
        request: &WebhookRequest,
    ) -> Result<(), ProcessingError> {
        let (channel, driver) = self.registry.resolve_named(channel)?;
        let topic = driver.extract_webhook_topic(request);

        let audit_log_id = self
            .log_store
            .insert(NewWebhookLog {
                channel: channel.clone(),
                topic: topic.to_string(),
                payload: RawPayload::new(request.body()),
                headers: request.headers().clone(),
            })
            .await?;

        self.publish_received(&channel, request, audit_log_id);

        let outcome = match self.apply_update(&channel, driver.as_ref(), request).await {
            Ok(updated) => {
                info!(
                    %channel,
                    %topic,
                    %audit_log_id,
                    remote_id = %updated.product.remote_id,
                    previous_quantity = updated.previous_quantity,
                    new_quantity = updated.new_quantity,
                    "webhook processed"
                );
                WebhookOutcome::Processed
            }
            Err(err) => {
                error!(%channel, %topic, %audit_log_id, error = %err, "webhook processing failed");
                WebhookOutcome::Failed(err.to_string())
            }
        };

        self.log_store.complete(audit_log_id, outcome).await?;
        Ok(())
    }

    /// The "heard you" signal. A failed publish is logged and does not stop
    /// the domain step.
    fn publish_received(
        &self,
        channel: &ChannelName,
        request: &WebhookRequest,
        audit_log_id: WebhookLogId,
    ) {
        let event = WebhookReceived {
            channel: channel.clone(),
            payload: request.decode_object().unwrap_or_default(),
            headers: request.headers().clone(),
            audit_log_id,
            occurred_at: Utc::now(),
        };
        if let Err(err) = self.bus.publish(event.into()) {
            warn!(%channel, %audit_log_id, error = ?err, "failed to publish webhook received event");
        }
    }

    async fn apply_update(
        &self,
        channel: &ChannelName,
        driver: &dyn InventoryDriver,
        request: &WebhookRequest,
    ) -> Result<InventoryUpdated, ProcessingError> {
        let update = driver
            .parse_webhook_payload(request)
            .map_err(ProcessingError::PayloadParse)?;

        let product = driver
            .fetch_product(&update.remote_id)
            .await
            .map_err(|source| ProcessingError::ProductFetch {
                remote_id: update.remote_id.clone(),
                source,
            })?;

        let updated = InventoryUpdated {
            channel: channel.clone(),
            previous_quantity: product.quantity_or_zero(),
            new_quantity: update.quantity,
            product,
            occurred_at: Utc::now(),
        };

        let event = ChannelEvent::from(updated.clone());
        let event_type = event.event_type();
        self.bus
            .publish(event)
            .map_err(|err| ProcessingError::Publish {
                event_type,
                reason: format!("{err:?}"),
            })?;

        Ok(updated)
    }
}

impl<L, B> core::fmt::Debug for WebhookProcessor<L, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebhookProcessor")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
