use std::time::Duration;

use async_trait::async_trait;

use crate::product::{Product, RemoteId, UpdatePayload};
use crate::webhook::{Topic, WebhookRequest};

/// Failure reported by a channel driver.
///
/// The processor treats every variant the same way (the request's domain step
/// is abandoned); the split exists for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The webhook body could not be interpreted as a canonical update.
    #[error("unparsable webhook payload: {0}")]
    Parse(String),
    /// The channel has no product under this id.
    #[error("product {0} not found on channel")]
    ProductNotFound(RemoteId),
    /// The channel did not answer in time.
    #[error("channel request timed out after {0:?}")]
    Timeout(Duration),
    /// Transport or unexpected-status failure talking to the channel.
    #[error("channel transport error: {0}")]
    Transport(String),
    /// The channel answered with a body we could not decode.
    #[error("undecodable channel response: {0}")]
    Decode(String),
}

impl DriverError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

/// Capability contract every channel integration implements.
///
/// One implementing type per channel; implementations own their credentials
/// and timeouts. Drivers are shared across concurrent requests, hence
/// `Send + Sync` and `&self` receivers.
#[async_trait]
pub trait InventoryDriver: Send + Sync {
    /// Channel-defined topic of this notification. Never fails; drivers fall
    /// back to [`Topic::unknown`].
    fn extract_webhook_topic(&self, request: &WebhookRequest) -> Topic;

    /// Interpret the webhook body as a canonical update.
    fn parse_webhook_payload(&self, request: &WebhookRequest) -> Result<UpdatePayload, DriverError>;

    /// Current product state on the channel.
    async fn fetch_product(&self, remote_id: &RemoteId) -> Result<Product, DriverError>;
}
