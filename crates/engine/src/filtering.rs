// SPDX-License-Identifier: MIT

//! Batch hide/restore of project windows via the scratchpad.
//!
//! Hiding records each window's current placement in the tracker, then
//! moves the whole set with one combined command. Restoring looks up the
//! tracked placement (fallback workspace when absent or no longer valid)
//! and brings the set back with one combined command.

use parking_lot::Mutex;
use tracing::{error, warn};

use i3pm_core::Clock;
use i3pm_storage::{WorkspaceTracker, SCRATCHPAD_WORKSPACE};
use i3pm_wm::{Node, WmCommander, WmError};

/// Workspace used when a window has no usable tracking record.
pub const FALLBACK_WORKSPACE: i32 = 1;

/// Result of a batch restore.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub errors: Vec<String>,
    pub fallback_warnings: Vec<String>,
}

/// Result of a batch hide.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct HideReport {
    pub hidden: usize,
    pub errors: Vec<String>,
}

/// Join per-window commands into one combined WM command.
pub fn build_batch_command(commands: &[String]) -> String {
    commands.join("; ")
}

/// Hide a set of windows to the scratchpad, recording placements first.
pub async fn hide_windows_batch(
    wm: &dyn WmCommander,
    tracker: &Mutex<WorkspaceTracker>,
    clock: &dyn Clock,
    con_ids: &[i64],
) -> Result<HideReport, WmError> {
    if con_ids.is_empty() {
        return Ok(HideReport::default());
    }

    let tree = wm.get_tree().await?;
    record_placements(&tree, tracker, clock, con_ids);

    let commands: Vec<String> = con_ids
        .iter()
        .map(|id| format!("[con_id={id}] move scratchpad"))
        .collect();

    let results = wm.run_command(&build_batch_command(&commands)).await?;

    let mut report = HideReport::default();
    for (i, outcome) in results.iter().enumerate() {
        if outcome.success {
            report.hidden += 1;
        } else {
            let con_id = con_ids.get(i).copied().unwrap_or_default();
            report.errors.push(format!(
                "failed to hide window {con_id}: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }
    Ok(report)
}

fn record_placements(
    tree: &Node,
    tracker: &Mutex<WorkspaceTracker>,
    clock: &dyn Clock,
    con_ids: &[i64],
) {
    let now_secs = clock.now_secs();
    let mut tracker = tracker.lock();

    for (window, workspace) in tree.windows_with_workspaces() {
        if !con_ids.contains(&window.id) {
            continue;
        }
        let workspace_number = workspace.and_then(|w| w.num).unwrap_or(SCRATCHPAD_WORKSPACE);

        // Mark-derived project/app, when present
        let parsed = window
            .marks
            .iter()
            .find_map(|m| i3pm_core::ParsedMark::parse(m));
        let (project, app) = match &parsed {
            Some(mark) => (mark.project.as_str(), mark.app.as_str()),
            None => ("", "unknown"),
        };

        tracker.track_window(
            window.id,
            workspace_number,
            window.is_floating(),
            project,
            app,
            window.window_class(),
            now_secs,
        );
    }
}

/// Restore a set of windows from the scratchpad to their tracked
/// workspaces.
pub async fn restore_windows_batch(
    wm: &dyn WmCommander,
    tracker: &Mutex<WorkspaceTracker>,
    con_ids: &[i64],
    fallback_workspace: i32,
) -> Result<RestoreReport, WmError> {
    if con_ids.is_empty() {
        return Ok(RestoreReport::default());
    }

    let existing: Vec<i32> = wm
        .get_workspaces()
        .await?
        .iter()
        .map(|ws| ws.num)
        .collect();

    let mut report = RestoreReport::default();
    let mut commands = Vec::with_capacity(con_ids.len());
    {
        let tracker = tracker.lock();
        for con_id in con_ids {
            let (mut workspace, floating) = match tracker.get(*con_id) {
                Some(entry) if entry.workspace_number != SCRATCHPAD_WORKSPACE => {
                    (entry.workspace_number, entry.floating)
                }
                Some(entry) => (fallback_workspace, entry.floating),
                None => (fallback_workspace, false),
            };

            if workspace != fallback_workspace && !existing.contains(&workspace) {
                warn!(
                    con_id,
                    workspace, fallback_workspace, "tracked workspace gone, using fallback"
                );
                report.fallback_warnings.push(format!(
                    "window {con_id}: WS {workspace} -> WS {fallback_workspace} (fallback)"
                ));
                workspace = fallback_workspace;
            }

            let floating_cmd = if floating {
                "floating enable"
            } else {
                "floating disable"
            };
            commands.push(format!(
                "[con_id={con_id}] scratchpad show, move workspace number {workspace}, {floating_cmd}"
            ));
        }
    }

    let results = wm.run_command(&build_batch_command(&commands)).await?;
    for (i, outcome) in results.iter().enumerate() {
        if outcome.success {
            report.restored += 1;
        } else {
            let con_id = con_ids.get(i).copied().unwrap_or_default();
            let message = format!(
                "failed to restore window {con_id}: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            error!("{message}");
            report.errors.push(message);
        }
    }
    Ok(report)
}

#[cfg(test)]
#[path = "filtering_tests.rs"]
mod tests;
