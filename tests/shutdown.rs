//! Graceful shutdown behavior.

use axum::http::StatusCode;
use event_relay::publish::{Behavior, MemoryBroker};
use serde_json::json;
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_shutdown_stops_the_server() {
    let relay = common::start_relay(common::test_config(None), MemoryBroker::new(1)).await;

    let res = common::client().get(relay.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    relay.shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), relay.handle)
        .await
        .expect("server did not stop")
        .unwrap();

    assert!(common::client().get(format!("http://{}/health", relay.addr)).send().await.is_err());
}

#[tokio::test]
async fn test_in_flight_publish_completes_during_drain() {
    let broker = MemoryBroker::new(1).with_behavior(Behavior::Slow(Duration::from_millis(300)));
    let relay = common::start_relay(common::test_config(None), broker).await;

    let url = relay.url("/logging");
    let request = tokio::spawn(async move {
        common::client()
            .post(url)
            .json(&json!({ "slow": true }))
            .send()
            .await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    relay.shutdown.trigger();

    let res = request.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(relay.broker.len(), 1);

    tokio::time::timeout(Duration::from_secs(5), relay.handle)
        .await
        .expect("server did not stop")
        .unwrap();
}
