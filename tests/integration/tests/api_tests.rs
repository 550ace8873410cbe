//! HTTP API tests
//!
//! The server runs over in-memory repositories and a fake messaging bridge,
//! with a database pool that never connects.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use std::time::Duration;

use chrono::{Duration as Span, Utc};
use courier_core::{InboundEvent, PhoneNumber, TaskStatus};
use integration_tests::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

const PHONE: &str = "+79001234567";

fn session_path(store: courier_core::StoreId) -> String {
    format!("/api/v1/stores/{store}/session")
}

fn feedback_path(store: courier_core::StoreId, rest: &str) -> String {
    format!("/api/v1/stores/{store}/feedback/{rest}")
}

/// Enable feedback and pair a session for a fresh store
async fn ready_store(server: &TestServer) -> anyhow::Result<courier_core::StoreId> {
    let store = unique_store();

    let response = server
        .put_auth(&feedback_path(store, "settings"), &json!({ "enabled": true }))
        .await?;
    assert_status(response, StatusCode::OK).await?;

    let response = server.post_auth(&session_path(store), &json!({})).await?;
    let body: Value = assert_json(response, StatusCode::OK).await?;
    assert_eq!(body["data"]["state"], "connected");

    Ok(store)
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let body: Value = assert_json(server.get("/health").await?, StatusCode::OK).await?;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_readiness_requires_database() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let body: Value =
        assert_json(server.get("/health/ready").await?, StatusCode::SERVICE_UNAVAILABLE).await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["checks"]["database"], false);
    assert_eq!(body["checks"]["messaging_bridge"], true);
    Ok(())
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_requests_without_api_key_rejected() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let path = feedback_path(unique_store(), "settings");

    let body: Value = assert_json(server.get(&path).await?, StatusCode::UNAUTHORIZED).await?;
    assert!(body["error"]["code"].is_string());

    let response = server
        .client
        .get(format!("{}{path}", server.base_url()))
        .bearer_auth("wrong-key")
        .send()
        .await?;
    assert_status(response, StatusCode::UNAUTHORIZED).await?;
    Ok(())
}

#[tokio::test]
async fn test_invalid_store_id_rejected() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let response = server.get_auth("/api/v1/stores/abc/feedback/settings").await?;
    assert_status(response, StatusCode::BAD_REQUEST).await?;
    Ok(())
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_session_lifecycle() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let store = unique_store();

    let body: Value = assert_json(server.get_auth(&session_path(store)).await?, StatusCode::OK).await?;
    assert_eq!(body["data"]["state"], "disconnected");
    assert_eq!(body["data"]["is_connected"], false);

    let body: Value =
        assert_json(server.post_auth(&session_path(store), &json!({})).await?, StatusCode::OK).await?;
    assert_eq!(body["data"]["state"], "connected");
    assert_eq!(body["data"]["is_connected"], true);

    let persisted = server.store.session(store).expect("session persisted");
    assert!(persisted.is_connected);
    assert!(persisted.credentials.is_some());

    assert_status(server.delete_auth(&session_path(store)).await?, StatusCode::NO_CONTENT).await?;

    let body: Value = assert_json(server.get_auth(&session_path(store)).await?, StatusCode::OK).await?;
    assert_eq!(body["data"]["is_connected"], false);
    Ok(())
}

#[tokio::test]
async fn test_status_falls_back_to_persisted_flag_when_bridge_offline() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let store = ready_store(&server).await?;

    server.bridge.set_offline(true);

    let body: Value = assert_json(server.get_auth(&session_path(store)).await?, StatusCode::OK).await?;
    assert_eq!(body["data"]["state"], "offline");
    assert_eq!(body["data"]["is_connected"], true);
    Ok(())
}

#[tokio::test]
async fn test_send_test_message() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let store = unique_store();
    let path = format!("{}/test-message", session_path(store));
    let request = json!({ "phone": PHONE, "text": "Проверка связи" });

    // No session yet
    let response = server.post_auth(&path, &request).await?;
    assert!(response.status().is_client_error() || response.status().is_server_error());

    server.post_auth(&session_path(store), &json!({})).await?;

    let body: Value = assert_json(server.post_auth(&path, &request).await?, StatusCode::OK).await?;
    assert!(body["data"]["message_id"].is_string());

    let sent = server.bridge.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, "Проверка связи");
    assert_eq!(sent[0].phone, "79001234567");
    Ok(())
}

// ============================================================================
// Feedback settings and enqueue
// ============================================================================

#[tokio::test]
async fn test_settings_get_and_update() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let store = unique_store();
    let path = feedback_path(store, "settings");

    let body: Value = assert_json(server.get_auth(&path).await?, StatusCode::OK).await?;
    assert_eq!(body["data"]["enabled"], false);
    assert_eq!(body["data"]["delay_minutes"], 10);
    assert_eq!(body["data"]["good_option"], GOOD);

    let update = json!({ "enabled": true, "delay_minutes": 30, "poll_question": "Как вам заказ?" });
    let body: Value = assert_json(server.put_auth(&path, &update).await?, StatusCode::OK).await?;
    assert_eq!(body["data"]["enabled"], true);
    assert_eq!(body["data"]["delay_minutes"], 30);
    assert_eq!(body["data"]["poll_question"], "Как вам заказ?");

    let body: Value = assert_json(server.get_auth(&path).await?, StatusCode::OK).await?;
    assert_eq!(body["data"]["delay_minutes"], 30);
    Ok(())
}

#[tokio::test]
async fn test_settings_validation() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let path = feedback_path(unique_store(), "settings");

    let body: Value = assert_json(
        server.put_auth(&path, &json!({ "expire_hours": 0 })).await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let response = server
        .put_auth(&path, &json!({ "good_option": BAD }))
        .await?;
    assert_status(response, StatusCode::BAD_REQUEST).await?;
    Ok(())
}

#[tokio::test]
async fn test_enqueue_created_then_duplicate() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let store = unique_store();
    let path = feedback_path(store, "tasks");
    let request = enqueue_request("ORD-77", PHONE);
    let body = json!({
        "order_id": request.order_id,
        "customer_phone": request.customer_phone,
        "review_links": request.review_links,
    });

    let created: Value = assert_json(server.post_auth(&path, &body).await?, StatusCode::CREATED).await?;
    assert_eq!(created["data"]["created"], true);
    assert_eq!(created["data"]["task"]["status"], "pending");
    assert_eq!(created["data"]["task"]["customer_phone"], "79001234567");

    let duplicate: Value = assert_json(server.post_auth(&path, &body).await?, StatusCode::OK).await?;
    assert_eq!(duplicate["data"]["created"], false);
    assert!(duplicate["data"].get("task").is_none());

    let stats: Value =
        assert_json(server.get_auth(&feedback_path(store, "stats")).await?, StatusCode::OK).await?;
    assert_eq!(stats["data"]["pending"], 1);
    assert_eq!(stats["data"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn test_enqueue_rejects_invalid_body() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let path = feedback_path(unique_store(), "tasks");

    let response = server
        .post_auth(&path, &json!({ "order_id": "", "customer_phone": PHONE }))
        .await?;
    assert_status(response, StatusCode::BAD_REQUEST).await?;

    let response = server.post_auth(&path, &json!({ "order_id": "A" })).await?;
    assert!(response.status().is_client_error());
    Ok(())
}

// ============================================================================
// Webhook
// ============================================================================

#[tokio::test]
async fn test_webhook_requires_secret() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .client
        .post(format!("{}/api/v1/webhooks/messaging", server.base_url()))
        .header(courier_api::extractors::WEBHOOK_SECRET_HEADER, "wrong")
        .json(&json!({ "store_id": 1, "phone": PHONE, "text": GOOD }))
        .send()
        .await?;
    assert_status(response, StatusCode::UNAUTHORIZED).await?;
    Ok(())
}

#[tokio::test]
async fn test_webhook_malformed_payload_acknowledged() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let body: Value = assert_json(
        server.post_webhook(&json!({ "unexpected": true })).await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(body, json!({ "outcome": "ignored", "reason": "invalid_payload" }));

    let body: Value = assert_json(
        server
            .post_webhook(&json!({ "store_id": 1, "phone": PHONE, "text": GOOD }))
            .await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(body["reason"], "no_open_poll");
    Ok(())
}

#[tokio::test]
async fn test_feedback_flow_over_http() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let store = ready_store(&server).await?;

    let request = enqueue_request("ORD-1", PHONE);
    let response = server
        .post_auth(
            &feedback_path(store, "tasks"),
            &json!({
                "order_id": request.order_id,
                "customer_phone": request.customer_phone,
                "review_links": request.review_links,
            }),
        )
        .await?;
    let created: Value = assert_json(response, StatusCode::CREATED).await?;
    let task_id = created["data"]["task"]["id"].as_i64().expect("task id");

    let report = server
        .app
        .scheduler
        .dispatch_due(Utc::now() + Span::minutes(11))
        .await?;
    assert_eq!(report.sent, 1);

    let poll = server.bridge.sent().pop().expect("poll sent");
    assert_eq!(poll.options, vec![GOOD.to_string(), BAD.to_string()]);
    assert_eq!(poll.idempotency_key, format!("feedback-poll-{task_id}"));

    let vote = json!({
        "store_id": store.into_inner(),
        "phone": PHONE,
        "poll_vote": { "poll_message_id": poll.message_id, "selected_options": [GOOD] }
    });
    let body: Value = assert_json(server.post_webhook(&vote).await?, StatusCode::OK).await?;
    assert_eq!(
        body,
        json!({ "outcome": "classified", "task_id": task_id, "verdict": "positive" })
    );

    let sent = server.bridge.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent[2].body.contains(REVIEW_LINK));

    // Provider redelivery changes nothing
    let body: Value = assert_json(server.post_webhook(&vote).await?, StatusCode::OK).await?;
    assert_eq!(body["outcome"], "ignored");
    assert_eq!(server.bridge.sent().len(), 3);

    let stats: Value =
        assert_json(server.get_auth(&feedback_path(store, "stats")).await?, StatusCode::OK).await?;
    assert_eq!(stats["data"]["positive"], 1);
    assert_eq!(stats["data"]["review_links_sent"], 1);
    Ok(())
}

#[tokio::test]
async fn test_reply_pushed_over_session_is_classified() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let store = ready_store(&server).await?;

    let request = enqueue_request("ORD-2", PHONE);
    server
        .post_auth(
            &feedback_path(store, "tasks"),
            &json!({
                "order_id": request.order_id,
                "customer_phone": request.customer_phone,
            }),
        )
        .await?;
    server
        .app
        .scheduler
        .dispatch_due(Utc::now() + Span::minutes(11))
        .await?;

    let phone = PhoneNumber::parse(PHONE)?;
    assert!(server.bridge.push_inbound(InboundEvent::text(store, phone, BAD)).await);

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let done = server
                .store
                .tasks()
                .iter()
                .any(|t| t.store_id == store && t.status == TaskStatus::Negative);
            if done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await?;

    let last = server.bridge.sent().pop().expect("response sent");
    assert!(!last.is_poll());
    assert!(!last.body.contains(REVIEW_LINK));
    Ok(())
}
