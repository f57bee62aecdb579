use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Map, Value, json};

use stocklink_api::app::{MAX_BODY_BYTES, build_app_with_body_limit, services::AppServices};
use stocklink_core::{BatchId, ChannelName};
use stocklink_events::EventBus;
use stocklink_infra::sync_jobs::{SyncJobTracker, job_types};
use stocklink_inventory::{
    ChannelEvent, DriverRegistry, InMemoryCatalog, JsonDriver, JsonDriverConfig, Product, RemoteId,
};

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with_body_limit(MAX_BODY_BYTES).await
    }

    async fn spawn_with_body_limit(max_body_bytes: usize) -> Self {
        let catalog = Arc::new(InMemoryCatalog::with_products([Product::new(
            RemoteId::new("SKU-1").unwrap(),
        )
        .with_quantity(10)]));
        let registry = DriverRegistry::new().with_driver(
            ChannelName::parse("acme").unwrap(),
            Arc::new(JsonDriver::new(JsonDriverConfig::generic(), catalog)),
        );
        let services = Arc::new(AppServices::in_memory(registry));

        // Same router as prod, bound to an ephemeral port.
        let app = build_app_with_body_limit(services.clone(), max_body_bytes);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post_webhook(srv: &TestServer, channel: &str, body: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(srv.url(&format!("/webhooks/{channel}")))
        .header("X-Webhook-Topic", "inventory/update")
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

async fn get_json(srv: &TestServer, path: &str) -> (StatusCode, Value) {
    let res = reqwest::get(srv.url(path)).await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn health_lists_configured_channels() {
    let srv = TestServer::spawn().await;
    let (status, body) = get_json(&srv, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["channels"], json!(["acme"]));
}

#[tokio::test]
async fn webhook_is_processed_and_audited() {
    let srv = TestServer::spawn().await;
    let events = srv.services.bus.subscribe();

    let res = post_webhook(&srv, "acme", r#"{"remote_id":"SKU-1","quantity":7}"#).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "received");

    let (status, logs) = get_json(&srv, "/webhook-logs?channel=acme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs["count"], 1);
    let row = &logs["items"][0];
    assert_eq!(row["status"], "processed");
    assert_eq!(row["topic"], "inventory/update");
    assert_eq!(row["headers"]["x-webhook-topic"], "inventory/update");

    let id = row["id"].as_str().unwrap();
    let (status, single) = get_json(&srv, &format!("/webhook-logs/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(single["payload"], r#"{"remote_id":"SKU-1","quantity":7}"#);

    let updates: Vec<_> = events
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            ChannelEvent::InventoryUpdated(u) => Some(u),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].previous_quantity, 10);
    assert_eq!(updates[0].new_quantity, 7);
}

#[tokio::test]
async fn failures_are_still_acknowledged() {
    let srv = TestServer::spawn().await;

    let res = post_webhook(&srv, "acme", "definitely not json").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = post_webhook(&srv, "acme", r#"{"remote_id":"SKU-X","quantity":1}"#).await;
    assert_eq!(res.status(), StatusCode::OK);

    let (_, failed) = get_json(&srv, "/webhook-logs?status=failed").await;
    assert_eq!(failed["count"], 2);
    let details: Vec<&str> = failed["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["failure_detail"].as_str().unwrap())
        .collect();
    assert!(details.iter().any(|d| d.contains("SKU-X")));
    assert!(details.iter().all(|d| !d.is_empty()));
}

#[tokio::test]
async fn binary_bodies_are_audited_unchanged() {
    let srv = TestServer::spawn().await;
    let raw = vec![0xffu8, 0xfe, 0x00, 0x41];

    let res = reqwest::Client::new()
        .post(srv.url("/webhooks/acme"))
        .body(raw.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (_, logs) = get_json(&srv, "/webhook-logs").await;
    assert_eq!(logs["count"], 1);
    assert_eq!(logs["items"][0]["payload"], json!([255, 254, 0, 65]));
    assert_eq!(logs["items"][0]["status"], "failed");
}

#[tokio::test]
async fn oversized_bodies_are_acknowledged_and_dropped() {
    let srv = TestServer::spawn_with_body_limit(64).await;

    let body = format!(r#"{{"remote_id":"SKU-1","quantity":7,"note":"{}"}}"#, "x".repeat(128));
    let res = post_webhook(&srv, "acme", &body).await;
    assert_eq!(res.status(), StatusCode::OK);
    let ack: Value = res.json().await.unwrap();
    assert_eq!(ack["status"], "dropped");

    let (_, logs) = get_json(&srv, "/webhook-logs").await;
    assert_eq!(logs["count"], 0);

    let res = post_webhook(&srv, "acme", r#"{"remote_id":"SKU-1","quantity":7}"#).await;
    assert_eq!(res.status(), StatusCode::OK);
    let (_, logs) = get_json(&srv, "/webhook-logs").await;
    assert_eq!(logs["count"], 1);
}

#[tokio::test]
async fn unknown_channel_is_acknowledged_without_audit_row() {
    let srv = TestServer::spawn().await;

    let res = post_webhook(&srv, "nowhere", r#"{"remote_id":"SKU-1","quantity":7}"#).await;
    assert_eq!(res.status(), StatusCode::OK);

    let (_, logs) = get_json(&srv, "/webhook-logs").await;
    assert_eq!(logs["count"], 0);
}

#[tokio::test]
async fn log_inspection_rejects_bad_input() {
    let srv = TestServer::spawn().await;

    let (status, body) = get_json(&srv, "/webhook-logs?status=done").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_status");

    let (status, body) = get_json(&srv, "/webhook-logs/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let missing = stocklink_core::WebhookLogId::new();
    let (status, body) = get_json(&srv, &format!("/webhook-logs/{missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn sync_jobs_are_inspectable() {
    let srv = TestServer::spawn().await;
    let tracker = SyncJobTracker::new(srv.services.sync_jobs.clone());
    let batch = BatchId::new();

    let a = tracker
        .enqueue(job_types::CATALOG, Some(batch), Map::new())
        .await
        .unwrap();
    let b = tracker
        .enqueue(job_types::PRODUCT, Some(batch), Map::new())
        .await
        .unwrap();
    tracker
        .enqueue(job_types::BATCH, None, Map::new())
        .await
        .unwrap();
    tracker.start(a.id).await.unwrap();
    tracker.complete(a.id).await.unwrap();
    tracker.start(b.id).await.unwrap();
    tracker.fail(b.id, "catalog unreachable").await.unwrap();

    let (status, stats) = get_json(&srv, "/sync-jobs/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["queued"], 1);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["failed"], 1);
    assert_eq!(stats["total"], 3);

    let (_, in_batch) = get_json(&srv, &format!("/sync-jobs?batch_id={batch}")).await;
    assert_eq!(in_batch["count"], 2);

    let (_, failed) = get_json(&srv, &format!("/sync-jobs?batch_id={batch}&status=failed")).await;
    assert_eq!(failed["count"], 1);
    assert_eq!(failed["items"][0]["metadata"]["error"], "catalog unreachable");

    let (status, job) = get_json(&srv, &format!("/sync-jobs/{}", a.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "completed");
    assert!(job["finished_at"].is_string());

    let (status, _) = get_json(&srv, &format!("/sync-jobs/{}", stocklink_core::SyncJobId::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
