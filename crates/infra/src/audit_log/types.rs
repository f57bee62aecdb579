use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocklink_core::{ChannelName, DomainError, WebhookLogId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookLogStatus {
    Pending,
    Processed,
    Failed,
}

impl WebhookLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookLogStatus::Pending => "pending",
            WebhookLogStatus::Processed => "processed",
            WebhookLogStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WebhookLogStatus::Pending)
    }
}

impl core::fmt::Display for WebhookLogStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for WebhookLogStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WebhookLogStatus::Pending),
            "processed" => Ok(WebhookLogStatus::Processed),
            "failed" => Ok(WebhookLogStatus::Failed),
            other => Err(DomainError::validation(format!(
                "unknown webhook log status `{other}`"
            ))),
        }
    }
}

/// Terminal result recorded against a pending row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    Failed(String),
}

impl WebhookOutcome {
    pub fn status(&self) -> WebhookLogStatus {
        match self {
            WebhookOutcome::Processed => WebhookLogStatus::Processed,
            WebhookOutcome::Failed(_) => WebhookLogStatus::Failed,
        }
    }

    pub fn failure_detail(&self) -> Option<&str> {
        match self {
            WebhookOutcome::Processed => None,
            WebhookOutcome::Failed(detail) => Some(detail),
        }
    }
}

/// Webhook body kept byte-for-byte.
///
/// Serializes as a JSON string when the bytes are valid UTF-8 and as an array
/// of bytes otherwise, so either form deserializes back to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PayloadRepr", into = "PayloadRepr")]
pub struct RawPayload(Vec<u8>);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PayloadRepr {
    Text(String),
    Bytes(Vec<u8>),
}

impl RawPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Display view; invalid UTF-8 shows as replacement characters.
    pub fn to_text_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<PayloadRepr> for RawPayload {
    fn from(repr: PayloadRepr) -> Self {
        match repr {
            PayloadRepr::Text(text) => Self(text.into_bytes()),
            PayloadRepr::Bytes(bytes) => Self(bytes),
        }
    }
}

impl From<RawPayload> for PayloadRepr {
    fn from(payload: RawPayload) -> Self {
        match String::from_utf8(payload.0) {
            Ok(text) => PayloadRepr::Text(text),
            Err(e) => PayloadRepr::Bytes(e.into_bytes()),
        }
    }
}

/// What the processor knows before the row exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWebhookLog {
    pub channel: ChannelName,
    pub topic: String,
    pub payload: RawPayload,
    pub headers: BTreeMap<String, String>,
}

/// A persisted audit-log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookLog {
    pub id: WebhookLogId,
    pub channel: ChannelName,
    pub topic: String,
    /// Raw body exactly as received.
    pub payload: RawPayload,
    pub headers: BTreeMap<String, String>,
    pub status: WebhookLogStatus,
    /// Set only when `status` is `failed`.
    pub failure_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookLog {
    pub fn pending(id: WebhookLogId, entry: NewWebhookLog, now: DateTime<Utc>) -> Self {
        Self {
            id,
            channel: entry.channel,
            topic: entry.topic,
            payload: entry.payload,
            headers: entry.headers,
            status: WebhookLogStatus::Pending,
            failure_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the row to its terminal status.
    pub fn complete(&mut self, outcome: WebhookOutcome, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::illegal_transition(
                "webhook log",
                self.status,
                outcome.status(),
            ));
        }
        self.status = outcome.status();
        self.failure_detail = match outcome {
            WebhookOutcome::Processed => None,
            WebhookOutcome::Failed(detail) => Some(detail),
        };
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn row() -> WebhookLog {
        WebhookLog::pending(
            WebhookLogId::new(),
            NewWebhookLog {
                channel: ChannelName::parse("shopify").unwrap(),
                topic: "inventory_levels/update".into(),
                payload: RawPayload::new("{}"),
                headers: BTreeMap::new(),
            },
            Utc::now(),
        )
    }

    fn outcome() -> impl Strategy<Value = WebhookOutcome> {
        prop_oneof![
            Just(WebhookOutcome::Processed),
            ".{1,20}".prop_map(WebhookOutcome::Failed),
        ]
    }

    #[test]
    fn failure_detail_only_on_failed() {
        let mut ok = row();
        ok.complete(WebhookOutcome::Processed, Utc::now()).unwrap();
        assert_eq!(ok.status, WebhookLogStatus::Processed);
        assert!(ok.failure_detail.is_none());

        let mut bad = row();
        bad.complete(WebhookOutcome::Failed("boom".into()), Utc::now()).unwrap();
        assert_eq!(bad.status, WebhookLogStatus::Failed);
        assert_eq!(bad.failure_detail.as_deref(), Some("boom"));
    }

    #[test]
    fn payload_keeps_arbitrary_bytes_through_json() {
        let raw = vec![0xff, 0xfe, 0x00, 0x41];
        let payload = RawPayload::new(raw.clone());
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.is_array());
        let back: RawPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back.as_bytes(), raw.as_slice());

        let text = RawPayload::new(r#"{"sku":"A"}"#);
        assert_eq!(serde_json::to_value(&text).unwrap(), r#"{"sku":"A"}"#);
    }

    #[test]
    fn status_strings_round_trip() {
        for s in [
            WebhookLogStatus::Pending,
            WebhookLogStatus::Processed,
            WebhookLogStatus::Failed,
        ] {
            assert_eq!(s.as_str().parse::<WebhookLogStatus>().unwrap(), s);
        }
        assert!("done".parse::<WebhookLogStatus>().is_err());
    }

    proptest! {
        #[test]
        fn a_row_completes_at_most_once(first in outcome(), second in outcome()) {
            let mut log = row();
            prop_assert!(log.complete(first.clone(), Utc::now()).is_ok());
            let before = log.clone();
            prop_assert!(log.complete(second, Utc::now()).is_err());
            prop_assert_eq!(log.status, first.status());
            prop_assert_eq!(&log, &before);
        }
    }
}
