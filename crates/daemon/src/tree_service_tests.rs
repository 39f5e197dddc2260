// SPDX-License-Identifier: MIT

use super::*;
use crate::tree_router::TreeSource;
use i3pm_core::{Event, FakeClock, Source};
use i3pm_engine::ProcEnvReader;
use i3pm_wm::WmError;
use tokio::sync::mpsc;

struct EmptyTree;

#[async_trait]
impl TreeSource for EmptyTree {
    async fn tree_json(&self) -> Result<Value, WmError> {
        Ok(serde_json::json!({"id": 1, "type": "root", "nodes": []}))
    }
}

fn harness() -> (TreeService, ClientHandle) {
    let ring = Arc::new(Mutex::new(EventRing::new(500)));
    let broadcaster = Broadcaster::new();
    let router = Arc::new(tokio::sync::Mutex::new(TreeRouter::new(
        Arc::new(EmptyTree),
        Arc::new(ProcEnvReader),
        Arc::clone(&ring),
        broadcaster.clone(),
        Arc::new(FakeClock::new(0)),
    )));

    let (tx, _rx) = mpsc::unbounded_channel();
    let client = broadcaster.register(tx);

    (
        TreeService {
            ring,
            router,
            broadcaster,
            start_time: Instant::now(),
        },
        client,
    )
}

#[tokio::test]
async fn ping_pongs() {
    let (service, client) = harness();
    let result = service.handle("ping", None, &client).await.unwrap();
    assert_eq!(result["pong"], true);
}

#[tokio::test]
async fn query_and_get_event() {
    let (service, client) = harness();
    {
        let mut ring = service.ring.lock();
        ring.add(
            Event::Tick {
                payload: "x".to_string(),
            },
            Source::Wm,
            1,
        );
    }

    let result = service.handle("query_events", None, &client).await.unwrap();
    assert_eq!(result["events"].as_array().unwrap().len(), 1);

    let single = service
        .handle(
            "get_event",
            Some(&serde_json::json!({"event_id": 1})),
            &client,
        )
        .await
        .unwrap();
    assert_eq!(single["event"]["type"], "tick");

    let missing = service
        .handle(
            "get_event",
            Some(&serde_json::json!({"event_id": 99})),
            &client,
        )
        .await
        .unwrap_err();
    assert_eq!(missing.code, crate::protocol::INVALID_PARAMS);
}

#[tokio::test]
async fn statistics_combine_ring_and_tree() {
    let (service, client) = harness();
    let result = service
        .handle("get_statistics", None, &client)
        .await
        .unwrap();
    assert_eq!(result["ring"]["max_size"], 500);
    assert_eq!(result["tree"]["events_captured"], 0);
    assert!(result["tree"]["cache"].is_object());
    assert!(result["tree"]["correlator"].is_object());
}

#[tokio::test]
async fn daemon_status_counts_subscribers() {
    let (service, client) = harness();
    client.set_subscribed(true);

    let result = service
        .handle("get_daemon_status", None, &client)
        .await
        .unwrap();
    assert_eq!(result["status"], "running");
    assert_eq!(result["subscribers"], 1);
}

#[tokio::test]
async fn unknown_method_is_rejected() {
    let (service, client) = harness();
    let err = service.handle("get_status", None, &client).await.unwrap_err();
    assert_eq!(err.code, crate::protocol::METHOD_NOT_FOUND);
}
