// SPDX-License-Identifier: MIT

//! Event router for the tree-diff daemon.
//!
//! Every relevant WM event triggers a snapshot capture; the differ runs
//! against the previous snapshot with Merkle pruning, the action
//! correlator attributes the change to recent input, and the result
//! lands in the ring.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use i3pm_core::{ActionType, Clock, Event, EventRing, Source, TreeSnapshot};
use i3pm_engine::{
    compute_diff, ActionCorrelator, CorrelatorStats, EnvReader, HashCache,
};
use i3pm_wm::{WmError, WmEvent};

use crate::listener::Broadcaster;
use crate::router::RouterFlow;

/// Raw-tree provider; the live implementation queries the WM connection.
#[async_trait]
pub trait TreeSource: Send + Sync {
    async fn tree_json(&self) -> Result<Value, WmError>;
}

#[async_trait]
impl TreeSource for crate::wm_handle::WmHandle {
    async fn tree_json(&self) -> Result<Value, WmError> {
        self.current().get_tree_raw().await
    }
}

/// Aggregate statistics for `get_statistics`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TreeStats {
    pub events_captured: u64,
    pub diffs_computed: u64,
    pub empty_diffs: u64,
    pub snapshots_taken: u64,
    pub cache: i3pm_engine::CacheStats,
    pub correlator: CorrelatorStats,
}

pub struct TreeRouter {
    source: Arc<dyn TreeSource>,
    env_reader: Arc<dyn EnvReader>,
    cache: HashCache,
    correlator: ActionCorrelator,
    ring: Arc<Mutex<EventRing>>,
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
    prev_snapshot: Option<TreeSnapshot>,
    next_snapshot_id: u64,
    next_diff_id: u64,
    events_captured: u64,
    diffs_computed: u64,
    empty_diffs: u64,
}

impl TreeRouter {
    pub fn new(
        source: Arc<dyn TreeSource>,
        env_reader: Arc<dyn EnvReader>,
        ring: Arc<Mutex<EventRing>>,
        broadcaster: Broadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            env_reader,
            cache: HashCache::new(Arc::clone(&clock)),
            correlator: ActionCorrelator::new(Arc::clone(&clock)),
            ring,
            broadcaster,
            clock,
            prev_snapshot: None,
            next_snapshot_id: 1,
            next_diff_id: 1,
            events_captured: 0,
            diffs_computed: 0,
            empty_diffs: 0,
        }
    }

    /// Process one WM event.
    pub async fn handle_wm_event(&mut self, event: WmEvent) -> RouterFlow {
        match &event {
            WmEvent::Binding(e) => {
                let action = self.correlator.add_action(
                    ActionType::Binding,
                    e.binding.symbol.clone(),
                    e.binding.command.clone(),
                );
                debug!(action_id = action.action_id, command = %e.binding.command, "recorded binding");
                self.record(
                    Event::BindingRun {
                        command: e.binding.command.clone(),
                        symbol: e.binding.symbol.clone(),
                    },
                    Source::Wm,
                );
                // Bindings usually cause a tree change; capture now so the
                // diff lands close to the action
                self.capture_and_diff("binding::run").await;
            }
            WmEvent::Shutdown(e) => {
                return match e.change.as_str() {
                    "restart" => RouterFlow::Reconnect,
                    "exit" => RouterFlow::Exit,
                    _ => RouterFlow::Continue,
                };
            }
            WmEvent::Window(e) => {
                self.capture_and_diff(&format!("window::{}", e.change)).await;
            }
            WmEvent::Workspace(e) => {
                self.capture_and_diff(&format!("workspace::{}", e.change))
                    .await;
            }
            WmEvent::Output(_) => {
                self.capture_and_diff("output::change").await;
            }
            WmEvent::Mode(_) => {
                self.capture_and_diff("mode::change").await;
            }
            WmEvent::Tick(e) => {
                self.record(
                    Event::Tick {
                        payload: e.payload.clone(),
                    },
                    Source::Wm,
                );
            }
        }
        RouterFlow::Continue
    }

    /// Capture a snapshot, diff it against the previous one, correlate,
    /// and record the change.
    pub async fn capture_and_diff(&mut self, event_source: &str) {
        let tree = match self.source.tree_json().await {
            Ok(tree) => tree,
            Err(e) => {
                warn!(error = %e, "snapshot capture failed");
                return;
            }
        };

        self.events_captured += 1;
        let mut hashes = HashMap::new();
        let snapshot = i3pm_engine::capture_snapshot(
            self.next_snapshot_id,
            self.clock.now_ms(),
            tree,
            event_source,
            self.env_reader.as_ref(),
            &mut hashes,
        );
        self.next_snapshot_id += 1;

        let Some(prev) = self.prev_snapshot.take() else {
            self.cache.update_batch(&hashes);
            self.prev_snapshot = Some(snapshot);
            return;
        };

        let diff = compute_diff(&prev, &snapshot, &mut self.cache, self.next_diff_id);
        self.next_diff_id += 1;
        self.diffs_computed += 1;

        self.cache.update_batch(&hashes);
        self.prev_snapshot = Some(snapshot);

        if diff.is_empty() {
            self.empty_diffs += 1;
            return;
        }

        // Attribute the change to recent input; the correlation references
        // the ring ID this entry is about to get
        let event_ts = self.clock.now_ms();
        let tree_event_id = self.ring.lock().next_id();
        let correlation = self
            .correlator
            .correlate(tree_event_id, event_source, event_ts);

        self.record(
            Event::TreeChanged {
                diff_id: diff.diff_id,
                before_snapshot_id: diff.before_snapshot_id,
                after_snapshot_id: diff.after_snapshot_id,
                change_count: diff.node_changes.len(),
                significance: diff.significance(),
                computation_time_ms: diff.computation_time_ms,
                event_source: event_source.to_string(),
                correlation,
            },
            Source::Wm,
        );
    }

    fn record(&self, event: Event, source: Source) {
        let entry = {
            let mut ring = self.ring.lock();
            ring.add(event, source, self.clock.now_ms())
        };
        self.broadcaster.broadcast_event(&entry);
    }

    /// Periodic cache sweep, driven from the main loop every 60 s.
    pub fn sweep_cache(&mut self) -> usize {
        let removed = self.cache.cleanup_expired();
        if removed > 0 {
            info!(removed, "hash cache sweep");
        }
        removed
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            events_captured: self.events_captured,
            diffs_computed: self.diffs_computed,
            empty_diffs: self.empty_diffs,
            snapshots_taken: self.next_snapshot_id - 1,
            cache: self.cache.stats(),
            correlator: self.correlator.stats(),
        }
    }
}

#[cfg(test)]
#[path = "tree_router_tests.rs"]
mod tests;
