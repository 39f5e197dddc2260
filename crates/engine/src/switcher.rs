// SPDX-License-Identifier: MIT

//! Project switch coordinator.
//!
//! Switch requests go through a FIFO queue consumed by one worker task,
//! so at most one switch is in flight and later requests never reorder.
//! A switch hides the old project's scoped windows to the scratchpad,
//! restores the new project's windows to their tracked workspaces,
//! updates the active-project pointer, and persists it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use i3pm_core::{Clock, Event, LaunchSpec, ProjectConfig, Source};
use i3pm_storage::{save_active_project, StateStore, WorkspaceTracker};
use i3pm_wm::{WmCommander, WmError};

use crate::filtering::{self, FALLBACK_WORKSPACE};

/// Queue depth for pending switch requests.
pub const SWITCH_QUEUE_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("switch coordinator is shutting down")]
    ShuttingDown,

    #[error("WM error: {0}")]
    Wm(#[from] WmError),
}

/// Result of one processed switch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SwitchOutcome {
    pub old: Option<String>,
    pub new: Option<String>,
    pub no_op: bool,
    pub windows_hidden: usize,
    pub windows_restored: usize,
    pub hide_errors: Vec<String>,
    pub restore_errors: Vec<String>,
    pub fallback_warnings: Vec<String>,
    pub auto_launched: usize,
    pub duration_ms: u64,
}

/// Spawns auto-launch commands; pluggable for tests.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(
        &self,
        spec: &LaunchSpec,
        project: &ProjectConfig,
    ) -> Result<(), std::io::Error>;
}

/// Real launcher: `sh -c <command>` with the project environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(
        &self,
        spec: &LaunchSpec,
        project: &ProjectConfig,
    ) -> Result<(), std::io::Error> {
        let mut command = tokio::process::Command::new("sh");
        command
            .arg("-c")
            .arg(&spec.command)
            .current_dir(&project.directory)
            .env("PROJECT_NAME", &project.name)
            .env("PROJECT_DIR", &project.directory);
        for (key, value) in &spec.env {
            command.env(key, value);
        }
        command.spawn()?;
        Ok(())
    }
}

struct SwitchRequest {
    target: Option<String>,
    reply: Option<oneshot::Sender<Result<SwitchOutcome, SwitchError>>>,
}

/// Clonable handle to the switch queue.
#[derive(Clone)]
pub struct ProjectSwitcher {
    tx: mpsc::Sender<SwitchRequest>,
}

/// Everything the worker needs to process a switch.
pub struct SwitcherDeps {
    pub wm: Arc<dyn WmCommander>,
    pub state: Arc<Mutex<StateStore>>,
    pub tracker: Arc<Mutex<WorkspaceTracker>>,
    pub clock: Arc<dyn Clock>,
    pub launcher: Arc<dyn Launcher>,
    pub active_project_path: PathBuf,
    /// Domain events produced by switches (fed into the ring by the
    /// router).
    pub events_tx: mpsc::UnboundedSender<(Event, Source)>,
}

impl ProjectSwitcher {
    /// Spawn the worker task; dropping every handle stops it.
    pub fn spawn(deps: SwitcherDeps) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(SWITCH_QUEUE_DEPTH);
        let handle = tokio::spawn(worker_loop(rx, deps));
        (Self { tx }, handle)
    }

    /// Enqueue a switch and wait for its outcome.
    pub async fn switch(
        &self,
        target: Option<String>,
    ) -> Result<SwitchOutcome, SwitchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SwitchRequest {
                target,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| SwitchError::ShuttingDown)?;
        reply_rx.await.map_err(|_| SwitchError::ShuttingDown)?
    }

    /// Enqueue a switch without waiting.
    pub fn request(&self, target: Option<String>) -> Result<(), SwitchError> {
        self.tx
            .try_send(SwitchRequest {
                target,
                reply: None,
            })
            .map_err(|_| {
                warn!("switch request dropped: queue closed or full");
                SwitchError::ShuttingDown
            })
    }
}

async fn worker_loop(mut rx: mpsc::Receiver<SwitchRequest>, deps: SwitcherDeps) {
    while let Some(request) = rx.recv().await {
        let result = process_switch(&deps, request.target.clone()).await;
        if let Err(e) = &result {
            error!(requested = ?request.target, error = %e, "project switch failed");
        }
        if let Some(reply) = request.reply {
            let _ = reply.send(result);
        }
    }
    info!("switch coordinator stopped");
}

async fn process_switch(
    deps: &SwitcherDeps,
    target: Option<String>,
) -> Result<SwitchOutcome, SwitchError> {
    let started_ms = deps.clock.now_ms();

    let old = {
        let state = deps.state.lock();
        state.active_project().map(String::from)
    };

    let mut outcome = SwitchOutcome {
        old: old.clone(),
        new: target.clone(),
        ..SwitchOutcome::default()
    };

    if old == target {
        outcome.no_op = true;
        outcome.duration_ms = deps.clock.now_ms().saturating_sub(started_ms);
        emit_switch_event(deps, &outcome);
        return Ok(outcome);
    }

    // Hide the old project's scoped windows
    if let Some(old_project) = &old {
        let hide_set: Vec<i64> = {
            let state = deps.state.lock();
            state
                .scoped_windows_of(old_project)
                .iter()
                .map(|w| w.con_id)
                .collect()
        };
        let report = filtering::hide_windows_batch(
            deps.wm.as_ref(),
            &deps.tracker,
            deps.clock.as_ref(),
            &hide_set,
        )
        .await?;
        outcome.windows_hidden = report.hidden;
        outcome.hide_errors = report.errors;
    }

    // Restore the new project's windows (global mode restores nothing)
    if let Some(new_project) = &target {
        let mut restore_set: Vec<i64> = {
            let state = deps.state.lock();
            state
                .scoped_windows_of(new_project)
                .iter()
                .map(|w| w.con_id)
                .collect()
        };
        {
            let tracker = deps.tracker.lock();
            for (con_id, _) in tracker.project_windows(new_project) {
                if !restore_set.contains(&con_id) {
                    restore_set.push(con_id);
                }
            }
        }
        restore_set.sort_unstable();

        let report = filtering::restore_windows_batch(
            deps.wm.as_ref(),
            &deps.tracker,
            &restore_set,
            FALLBACK_WORKSPACE,
        )
        .await?;
        outcome.windows_restored = report.restored;
        outcome.restore_errors = report.errors;
        outcome.fallback_warnings = report.fallback_warnings;
    }

    // Commit the transition and persist it
    {
        let mut state = deps.state.lock();
        state.set_active_project(target.clone());
    }
    if let Err(e) = save_active_project(
        &deps.active_project_path,
        target.as_deref(),
        old.as_deref(),
    ) {
        warn!(error = %e, "failed to persist active project");
    }

    // Auto-launch only when the new project came up with no windows
    if let Some(new_project) = &target {
        let (config, live) = {
            let state = deps.state.lock();
            (
                state.projects.get(new_project).cloned(),
                state.window_count_of(new_project),
            )
        };
        if let Some(config) = config {
            if live == 0 && !config.auto_launch.is_empty() {
                outcome.auto_launched =
                    auto_launch(deps, &config).await;
            }
        }
    }

    outcome.duration_ms = deps.clock.now_ms().saturating_sub(started_ms);
    emit_switch_event(deps, &outcome);
    info!(
        old = ?outcome.old,
        new = ?outcome.new,
        hidden = outcome.windows_hidden,
        restored = outcome.windows_restored,
        "project switch complete"
    );
    Ok(outcome)
}

/// Run a project's auto-launch list. Individual failures never abort the
/// sequence; returns how many entries were spawned.
async fn auto_launch(deps: &SwitcherDeps, config: &ProjectConfig) -> usize {
    let mut launched = 0;

    for spec in &config.auto_launch {
        if let Some(workspace) = spec.workspace {
            if let Err(e) = deps
                .wm
                .run_command(&format!("workspace number {workspace}"))
                .await
            {
                warn!(workspace, error = %e, "failed to focus auto-launch workspace");
            }
        }

        match deps.launcher.launch(spec, config).await {
            Ok(()) => launched += 1,
            Err(e) => {
                warn!(command = %spec.command, error = %e, "auto-launch entry failed");
                continue;
            }
        }

        if let Some(mark) = &spec.wait_for_mark {
            wait_for_mark(deps.wm.as_ref(), mark, spec.wait_timeout_ms).await;
        }
        if spec.launch_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(spec.launch_delay_ms)).await;
        }
    }

    launched
}

/// Best-effort wait for a mark to appear; timing out is not an error.
async fn wait_for_mark(wm: &dyn WmCommander, mark: &str, timeout_ms: u64) {
    let deadline = std::time::Duration::from_millis(timeout_ms);
    let poll = async {
        loop {
            match wm.get_marks().await {
                Ok(marks) if marks.iter().any(|m| m == mark) => return,
                Ok(_) => {}
                Err(_) => return,
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    };
    if tokio::time::timeout(deadline, poll).await.is_err() {
        warn!(mark, timeout_ms, "mark did not appear before timeout");
    }
}

fn emit_switch_event(deps: &SwitcherDeps, outcome: &SwitchOutcome) {
    let event = Event::ProjectSwitch {
        old: outcome.old.clone(),
        new: outcome.new.clone(),
        windows_hidden: outcome.windows_hidden,
        windows_restored: outcome.windows_restored,
        duration_ms: outcome.duration_ms,
    };
    let _ = deps.events_tx.send((event, Source::Daemon));
}

#[cfg(test)]
#[path = "switcher_tests.rs"]
mod tests;
