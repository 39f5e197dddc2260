// SPDX-License-Identifier: MIT

//! Action→event correlation: rolling action window plus cascade tracking.
//!
//! Binding (and other input) events land in a 5 s rolling window; each
//! tree event is scored against every action still inside the 500 ms
//! correlation window. High-confidence attributions open a cascade chain
//! so follow-on effects are scored as secondary/tertiary.

use std::collections::VecDeque;
use std::sync::Arc;

use i3pm_core::{
    calculate_confidence, ActionType, Clock, EventCorrelation, UserAction, CORRELATION_WINDOW_MS,
};

/// How long actions stay in the rolling window.
pub const ACTION_WINDOW_MS: u64 = 5_000;

/// Bound on retained actions.
pub const MAX_ACTIONS: usize = 100;

/// Confidence at which an attribution opens a cascade chain.
pub const PRIMARY_THRESHOLD: f64 = 0.7;

/// Bound on simultaneously tracked chains.
pub const MAX_CASCADES: usize = 50;

/// Completed chains older than this are evicted.
pub const CASCADE_RETENTION_MS: u64 = 5_000;

/// Chain window: beyond this after the primary, the chain closes.
pub const CASCADE_WINDOW_MS: u64 = 500;

/// One chain of cascading effects behind a primary event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeChain {
    pub primary_event_id: u64,
    pub secondary_event_ids: Vec<u64>,
    pub tertiary_event_ids: Vec<u64>,
    pub started_at_ms: u64,
    pub completed: bool,
}

/// Tracks cascade chains of tree events.
#[derive(Debug, Default)]
pub struct CascadeTracker {
    chains: VecDeque<CascadeChain>,
    total_chains: u64,
}

impl CascadeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a chain behind a primary event.
    pub fn start_cascade(&mut self, primary_event_id: u64, now_ms: u64) {
        self.chains.push_back(CascadeChain {
            primary_event_id,
            secondary_event_ids: Vec::new(),
            tertiary_event_ids: Vec::new(),
            started_at_ms: now_ms,
            completed: false,
        });
        if self.chains.len() > MAX_CASCADES {
            self.chains.pop_front();
        }
        self.total_chains += 1;
    }

    /// Place an event into the most recent open chain, if its timing
    /// fits. Depth 1 within 200 ms of the primary, depth 2 within
    /// 400 ms; beyond the window the chain closes.
    pub fn add_to_cascade(&mut self, event_id: u64, event_ts_ms: u64) -> Option<u32> {
        for chain in self.chains.iter_mut().rev() {
            if chain.completed {
                continue;
            }

            let delta = event_ts_ms.saturating_sub(chain.started_at_ms);
            if delta > CASCADE_WINDOW_MS {
                chain.completed = true;
                continue;
            }

            if delta <= 200 {
                chain.secondary_event_ids.push(event_id);
                return Some(1);
            } else if delta <= 400 {
                chain.tertiary_event_ids.push(event_id);
                return Some(2);
            } else {
                chain.completed = true;
            }
        }
        None
    }

    /// Drop completed chains past the retention horizon.
    pub fn evict_stale(&mut self, now_ms: u64) {
        self.chains.retain(|chain| {
            !(chain.completed
                && now_ms.saturating_sub(chain.started_at_ms) > CASCADE_RETENTION_MS)
        });
    }

    pub fn active_chains(&self) -> usize {
        self.chains.iter().filter(|c| !c.completed).count()
    }

    pub fn total_chains(&self) -> u64 {
        self.total_chains
    }
}

/// Correlator statistics for the tree-diff daemon's RPC surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct CorrelatorStats {
    pub actions_in_window: usize,
    pub total_actions: u64,
    pub total_correlations: u64,
    pub active_cascades: usize,
    pub total_cascades: u64,
}

/// Rolling window of user actions with per-event scoring.
pub struct ActionCorrelator {
    actions: VecDeque<UserAction>,
    cascade: CascadeTracker,
    clock: Arc<dyn Clock>,
    next_action_id: u64,
    total_actions: u64,
    total_correlations: u64,
}

impl ActionCorrelator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            actions: VecDeque::new(),
            cascade: CascadeTracker::new(),
            clock,
            next_action_id: 1,
            total_actions: 0,
            total_correlations: 0,
        }
    }

    /// Record a user action (binding press, IPC command, …).
    pub fn add_action(
        &mut self,
        action_type: ActionType,
        symbol: Option<String>,
        command: String,
    ) -> UserAction {
        let action = UserAction {
            action_id: self.next_action_id,
            timestamp_ms: self.clock.now_ms(),
            action_type,
            symbol,
            command,
        };
        self.next_action_id += 1;
        self.total_actions += 1;

        self.actions.push_back(action.clone());
        if self.actions.len() > MAX_ACTIONS {
            self.actions.pop_front();
        }
        self.prune();
        action
    }

    /// Score a tree event against the action window and return the best
    /// attribution, if any action qualifies.
    pub fn correlate(
        &mut self,
        tree_event_id: u64,
        event_type: &str,
        event_ts_ms: u64,
    ) -> Option<EventCorrelation> {
        self.prune();
        self.cascade.evict_stale(event_ts_ms);

        let cascade_depth = self
            .cascade
            .add_to_cascade(tree_event_id, event_ts_ms)
            .unwrap_or(0);

        let candidates: Vec<UserAction> = self
            .actions
            .iter()
            .filter(|a| {
                a.timestamp_ms <= event_ts_ms
                    && event_ts_ms - a.timestamp_ms <= CORRELATION_WINDOW_MS
            })
            .cloned()
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let competing = candidates.len() - 1;

        let mut best: Option<EventCorrelation> = None;
        for action in &candidates {
            let time_delta_ms = event_ts_ms - action.timestamp_ms;
            let (confidence, level, factors, reasoning) =
                calculate_confidence(action, event_type, time_delta_ms, competing, cascade_depth);

            let correlation = EventCorrelation {
                correlation_id: uuid::Uuid::new_v4().to_string(),
                action_id: action.action_id,
                tree_event_id,
                time_delta_ms: time_delta_ms as i64,
                confidence,
                level,
                factors,
                cascade_depth,
                reasoning,
            };

            let replace = match &best {
                None => true,
                Some(current) => confidence > current.confidence,
            };
            if replace {
                best = Some(correlation);
            }
        }

        if let Some(correlation) = &best {
            self.total_correlations += 1;
            // A confident primary attribution opens a chain for follow-on
            // effects
            if correlation.cascade_depth == 0 && correlation.confidence >= PRIMARY_THRESHOLD {
                self.cascade.start_cascade(tree_event_id, event_ts_ms);
            }
        }

        best
    }

    pub fn stats(&self) -> CorrelatorStats {
        CorrelatorStats {
            actions_in_window: self.actions.len(),
            total_actions: self.total_actions,
            total_correlations: self.total_correlations,
            active_cascades: self.cascade.active_chains(),
            total_cascades: self.cascade.total_chains(),
        }
    }

    fn prune(&mut self) {
        let now_ms = self.clock.now_ms();
        while let Some(front) = self.actions.front() {
            if now_ms.saturating_sub(front.timestamp_ms) > ACTION_WINDOW_MS {
                self.actions.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "causality_tests.rs"]
mod tests;
