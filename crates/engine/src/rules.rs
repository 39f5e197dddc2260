// SPDX-License-Identifier: MIT

//! Rule engine: evaluates window-new rules and executes their actions.
//!
//! The in-memory rule list is swapped atomically on config reload (the
//! daemon owns the file watcher). Actions run in declared order; a failed
//! action is reported and the rest still run.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, warn};

use i3pm_core::{ActionOutcome, RuleAction, WindowRecord, WindowRule};
use i3pm_wm::WmCommander;

/// Per-action latency target; slower actions are logged.
pub const ACTION_BUDGET_MS: u128 = 25;

/// Shared, hot-swappable rule list.
#[derive(Clone, Default)]
pub struct RuleEngine {
    rules: Arc<RwLock<Vec<WindowRule>>>,
}

impl RuleEngine {
    pub fn new(rules: Vec<WindowRule>) -> Self {
        Self {
            rules: Arc::new(RwLock::new(rules)),
        }
    }

    /// Replace the rule list (hot reload).
    pub fn swap(&self, rules: Vec<WindowRule>) {
        *self.rules.write() = rules;
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Evaluate all rules against a fresh window, executing actions of
    /// every matching rule in declared order.
    pub async fn apply(
        &self,
        wm: &dyn WmCommander,
        window: &WindowRecord,
    ) -> Vec<ActionOutcome> {
        let matching: Vec<WindowRule> = {
            let rules = self.rules.read();
            rules
                .iter()
                .filter(|rule| match rule.criteria.matches(window) {
                    Ok(matched) => matched,
                    Err(e) => {
                        warn!(error = %e, "bad rule pattern, skipping rule");
                        false
                    }
                })
                .cloned()
                .collect()
        };

        let mut outcomes = Vec::new();
        for rule in matching {
            for action in &rule.actions {
                outcomes.push(execute_action(wm, window, action).await);
            }
        }
        outcomes
    }
}

/// Execute one action against the WM.
pub async fn execute_action(
    wm: &dyn WmCommander,
    window: &WindowRecord,
    action: &RuleAction,
) -> ActionOutcome {
    let started = Instant::now();
    let outcome = run_action(wm, window, action).await;

    let elapsed = started.elapsed().as_millis();
    if elapsed > ACTION_BUDGET_MS {
        warn!(
            action = action.name(),
            con_id = window.con_id,
            elapsed_ms = elapsed,
            "rule action exceeded latency budget"
        );
    }

    outcome
}

async fn run_action(
    wm: &dyn WmCommander,
    window: &WindowRecord,
    action: &RuleAction,
) -> ActionOutcome {
    let command = match action {
        RuleAction::Workspace { target, follow } => {
            match validate_target_workspace(wm, *target).await {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    debug!(target, con_id = window.con_id, %reason, "skipping workspace move");
                    return ActionOutcome::failed(action, reason);
                }
                Err(e) => return ActionOutcome::failed(action, e.to_string()),
            }
            if *follow {
                format!(
                    "[con_id={}] move container to workspace number {target}; workspace number {target}",
                    window.con_id
                )
            } else {
                format!(
                    "[con_id={}] move container to workspace number {target}",
                    window.con_id
                )
            }
        }
        RuleAction::Mark { value } => match window.surface_id {
            Some(surface_id) => format!("[id={surface_id}] mark --add \"{value}\""),
            None => format!("[con_id={}] mark --add \"{value}\"", window.con_id),
        },
        RuleAction::Float { enable } => {
            let verb = if *enable { "enable" } else { "disable" };
            format!("[con_id={}] floating {verb}", window.con_id)
        }
        RuleAction::Layout { mode } => {
            format!("[con_id={}] layout {}", window.con_id, mode.as_str())
        }
    };

    match wm.run_command(&command).await {
        Ok(results) => match results.iter().find(|r| !r.success) {
            Some(failed) => ActionOutcome::failed(
                action,
                failed.error.clone().unwrap_or_else(|| "command failed".to_string()),
            ),
            None => ActionOutcome::ok(action),
        },
        Err(e) => ActionOutcome::failed(action, e.to_string()),
    }
}

/// Validate that a target workspace resides on an active output.
///
/// A workspace that does not exist yet is valid (the WM creates it on the
/// current output); an existing workspace is rejected when its output is
/// not in the active set. `None` means valid, `Some(reason)` means skip.
async fn validate_target_workspace(
    wm: &dyn WmCommander,
    target: i32,
) -> Result<Option<String>, i3pm_wm::WmError> {
    let workspaces = wm.get_workspaces().await?;
    let outputs = wm.get_outputs().await?;

    let active_outputs: std::collections::BTreeSet<&str> = outputs
        .iter()
        .filter(|o| o.active)
        .map(|o| o.name.as_str())
        .collect();
    if active_outputs.is_empty() {
        return Ok(Some("no active outputs detected".to_string()));
    }

    let Some(existing) = workspaces.iter().find(|ws| ws.num == target) else {
        return Ok(None);
    };

    if !active_outputs.contains(existing.output.as_str()) {
        return Ok(Some(format!(
            "workspace {target} is on inactive output '{}'",
            existing.output
        )));
    }
    Ok(None)
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
