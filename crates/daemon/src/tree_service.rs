// SPDX-License-Identifier: MIT

//! RPC method handlers for the tree-diff daemon.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use i3pm_core::EventRing;

use crate::listener::{Broadcaster, ClientHandle, RpcService};
use crate::protocol::RpcError;
use crate::service::{list_monitors, subscribe_events};
use crate::tree_router::TreeRouter;

pub struct TreeService {
    pub ring: Arc<Mutex<EventRing>>,
    pub router: Arc<tokio::sync::Mutex<TreeRouter>>,
    pub broadcaster: Broadcaster,
    pub start_time: Instant,
}

#[async_trait]
impl RpcService for TreeService {
    async fn handle(
        &self,
        method: &str,
        params: Option<&Value>,
        client: &ClientHandle,
    ) -> Result<Value, RpcError> {
        match method {
            "ping" => Ok(json!({"pong": true})),
            "query_events" => self.query_events(params),
            "get_event" => self.get_event(params),
            "get_statistics" => self.get_statistics().await,
            "get_daemon_status" => self.get_daemon_status().await,
            "subscribe_events" => subscribe_events(params, client),
            "list_monitors" => Ok(list_monitors(&self.broadcaster)),
            other => Err(RpcError::method_not_found(other)),
        }
    }
}

impl TreeService {
    fn query_events(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let limit = params
            .and_then(|p| p.get("limit"))
            .and_then(Value::as_u64)
            .unwrap_or(100) as usize;
        let event_type = params
            .and_then(|p| p.get("event_type"))
            .and_then(Value::as_str)
            .map(String::from);
        let since_id = params.and_then(|p| p.get("since_id")).and_then(Value::as_u64);

        let ring = self.ring.lock();
        Ok(json!({"events": ring.query(limit, event_type.as_deref(), since_id)}))
    }

    fn get_event(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let event_id = params
            .and_then(|p| p.get("event_id"))
            .and_then(Value::as_u64)
            .ok_or_else(|| RpcError::invalid_params("event_id required"))?;

        let ring = self.ring.lock();
        match ring.get(event_id) {
            Some(entry) => Ok(json!({"event": entry})),
            None => Err(RpcError::invalid_params(format!(
                "no such event: {event_id}"
            ))),
        }
    }

    async fn get_statistics(&self) -> Result<Value, RpcError> {
        let stats = {
            let router = self.router.lock().await;
            router.stats()
        };
        let ring_stats = self.ring.lock().stats();
        Ok(json!({
            "ring": ring_stats,
            "tree": stats,
        }))
    }

    async fn get_daemon_status(&self) -> Result<Value, RpcError> {
        let stats = {
            let router = self.router.lock().await;
            router.stats()
        };
        Ok(json!({
            "status": "running",
            "uptime_seconds": self.start_time.elapsed().as_secs(),
            "events_captured": stats.events_captured,
            "diffs_computed": stats.diffs_computed,
            "subscribers": self.broadcaster.client_list().iter().filter(|(_, s)| *s).count(),
        }))
    }
}

#[cfg(test)]
#[path = "tree_service_tests.rs"]
mod tests;
