//! End-to-end ingest tests against an in-memory broker.

use axum::http::StatusCode;
use event_relay::event::decode;
use event_relay::observability::Level;
use event_relay::publish::{Behavior, MemoryBroker};
use serde_json::{json, Value};
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_ingest_publishes_and_acknowledges() {
    let relay = common::start_relay(common::test_config(None), MemoryBroker::new(3)).await;

    let res = common::client()
        .post(relay.url("/logging"))
        .json(&json!({ "userId": "u1", "action": "login" }))
        .send()
        .await
        .expect("relay unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&request_id).is_ok());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "success" }));

    let messages = relay.broker.messages("example-topic");
    assert_eq!(messages.len(), 1);
    let envelope = decode(&messages[0].payload).unwrap();
    assert_eq!(envelope.header.event_name, "user-action");
    assert_eq!(envelope.header.event_type, "event");
    assert_eq!(envelope.header.session_id, request_id);
    assert_eq!(envelope.body, json!({ "userId": "u1", "action": "login" }));

    let results = relay.sink.events("publish.result");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get("partition"), Some(&Value::from(messages[0].partition)));
    assert_eq!(results[0].get("offset"), Some(&Value::from(messages[0].offset)));
}

#[tokio::test]
async fn test_inbound_trace_headers_are_kept() {
    let relay = common::start_relay(common::test_config(None), MemoryBroker::new(1)).await;

    let res = common::client()
        .post(relay.url("/logging"))
        .header("x-request-id", "trace-42")
        .header("x-parent-id", "parent-7")
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .body(r#"{"n":1}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "trace-42");

    let records = relay.sink.for_request("trace-42");
    assert_eq!(records.len(), 2, "one access record and one result record");

    let span = records[0].get_str("span_id").unwrap().to_string();
    assert_ne!(span, "trace-42");
    assert_ne!(span, "parent-7");
    for record in &records {
        assert_eq!(record.get_str("parent_id"), Some("parent-7"));
        assert_eq!(record.get_str("span_id"), Some(span.as_str()));
    }

    let access = relay.sink.events("http.request");
    assert_eq!(access[0].get("client").unwrap()["client_ip"], "203.0.113.9");
    assert_eq!(access[0].get_str("method"), Some("POST"));
    assert_eq!(access[0].get_str("path"), Some("/logging"));
}

#[tokio::test]
async fn test_wrapped_input_keeps_caller_session() {
    let relay = common::start_relay(common::test_config(None), MemoryBroker::new(1)).await;

    let res = common::client()
        .post(relay.url("/logging"))
        .json(&json!({
            "header": { "sessionId": "sess-1", "userId": "user-9", "eventName": "ignored" },
            "body": [1, 2, 3]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let envelope = decode(&relay.broker.messages("example-topic")[0].payload).unwrap();
    assert_eq!(envelope.header.event_name, "user-action");
    assert_eq!(envelope.header.session_id, "sess-1");
    assert_eq!(envelope.header.user_id, "user-9");
    assert_eq!(envelope.body, json!([1, 2, 3]));
}

#[tokio::test]
async fn test_broker_unreachable_returns_500() {
    let broker = MemoryBroker::new(1).with_behavior(Behavior::Unreachable);
    let relay = common::start_relay(common::test_config(None), broker).await;

    let res = common::client()
        .post(relay.url("/logging"))
        .json(&json!({ "action": "click" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["error"], "Internal Server Error");

    assert!(relay.sink.events("publish.result").is_empty());
    let failed = relay.sink.events("publish.failed");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].level, Level::Error);
    assert_eq!(failed[0].get_str("request_id"), Some(request_id.as_str()));
    assert!(failed[0]
        .get_str("error")
        .unwrap()
        .contains("All broker connections are down"));

    let access = relay.sink.events("http.request");
    assert_eq!(access.len(), 1);
    assert_eq!(access[0].get("status"), Some(&Value::from(500)));
    assert_eq!(access[0].get_str("request_id"), Some(request_id.as_str()));
}

#[tokio::test]
async fn test_malformed_body_is_rejected_without_publish() {
    let relay = common::start_relay(common::test_config(None), MemoryBroker::new(1)).await;
    let payload = format!("{{\"broken\": {}", "x".repeat(400));

    let res = common::client()
        .post(relay.url("/logging"))
        .header("content-type", "application/json")
        .body(payload)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["error"], "Bad Request");

    assert!(relay.broker.is_empty());
    assert!(relay.sink.events("publish.result").is_empty());

    let rejected = relay.sink.events("ingest.rejected");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].level, Level::Info);
    assert_eq!(rejected[0].get_str("payload").unwrap().chars().count(), 256);

    let access = relay.sink.events("http.request");
    assert_eq!(access.len(), 1);
    assert_eq!(access[0].get("status"), Some(&Value::from(400)));
    assert_eq!(access[0].get_str("path"), Some("/logging"));
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let mut config = common::test_config(None);
    config.listener.max_body_bytes = 64;
    let relay = common::start_relay(config, MemoryBroker::new(1)).await;

    let res = common::client()
        .post(relay.url("/logging"))
        .json(&json!({ "blob": "y".repeat(512) }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 413);
    assert_eq!(body["error"], "Payload Too Large");
    assert!(relay.broker.is_empty());

    let access = relay.sink.events("http.request");
    assert_eq!(access[0].get("status"), Some(&Value::from(413)));
}

#[tokio::test]
async fn test_slow_broker_outlasts_request_timeout() {
    let mut config = common::test_config(None);
    config.listener.request_timeout_secs = 1;
    let broker = MemoryBroker::new(1).with_behavior(Behavior::Slow(Duration::from_millis(1500)));
    let relay = common::start_relay(config, broker).await;

    let res = common::client()
        .post(relay.url("/logging"))
        .json(&json!({ "action": "slow" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(relay.broker.len(), 1);

    let results = relay.sink.events("publish.result");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get_str("request_id"), Some(request_id.as_str()));
    let access = relay.sink.events("http.request");
    assert_eq!(access.len(), 1);
    assert_eq!(access[0].get("status"), Some(&Value::from(200)));
}

#[tokio::test]
async fn test_wrong_method_uses_error_shape() {
    let relay = common::start_relay(common::test_config(None), MemoryBroker::new(1)).await;

    let res = common::client().get(relay.url("/logging")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(res.headers().contains_key("allow"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 405);
    assert_eq!(body["message"], "method not allowed on this route");
}
