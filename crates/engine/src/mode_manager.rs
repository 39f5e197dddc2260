// SPDX-License-Identifier: MIT

//! Transient input-mode state machine (workspace goto/move, project
//! select).
//!
//! The state is an explicit enum; every transition emits a notification
//! that the RPC layer fans out to preview UIs. Execution goes to the WM
//! (workspace input) or the switch coordinator (project input).

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use i3pm_core::{
    filter_projects, fuzzy_match_project, parse_workspace_digits, Clock, InputType, ModeType,
    OutputRoles, ScoredProject, WorkspaceSwitch,
};
use i3pm_storage::StateStore;
use i3pm_wm::{WmCommander, WmError};

use crate::switcher::{ProjectSwitcher, SwitchError};

/// Retained workspace-switch history entries.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ModeError {
    #[error("mode is not active")]
    NotActive,

    #[error("a mode is already active")]
    AlreadyActive,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no project matches '{0}'")]
    NoMatch(String),

    #[error("WM error: {0}")]
    Wm(#[from] WmError),

    #[error("switch error: {0}")]
    Switch(#[from] SwitchError),
}

/// Active-mode accumulator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMode {
    pub mode_type: ModeType,
    pub input_type: InputType,
    pub digits: String,
    pub chars: String,
    pub entered_at_ms: u64,
}

/// The mode FSM: either inactive or accumulating input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModeState {
    #[default]
    Inactive,
    Active(ActiveMode),
}

/// Serializable snapshot delivered with every notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSnapshot {
    pub active: bool,
    pub mode_type: Option<ModeType>,
    pub input_type: InputType,
    pub accumulated_digits: String,
    pub accumulated_chars: String,
    pub output_cache: OutputRoles,
}

/// Derived pending target shown in previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingWorkspace {
    pub workspace_number: u32,
    pub accumulated_digits: String,
    pub mode_type: ModeType,
    pub target_output: String,
}

/// Notifications emitted on every transition, fanned out by the RPC
/// layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModeNotification {
    WorkspaceMode {
        event_type: String,
        state: ModeSnapshot,
        #[serde(skip_serializing_if = "Option::is_none")]
        pending_workspace: Option<PendingWorkspace>,
    },
    ProjectMode {
        event_type: String,
        state: ModeSnapshot,
        projects: Vec<ScoredProject>,
    },
    EnterKeySelect,
    ArrowKeyNav {
        direction: String,
    },
    HomeKeyNav,
    EndKeyNav,
    DeleteKeyClose,
    WindowAction {
        action: String,
    },
}

impl ModeNotification {
    /// RPC notification method name.
    pub fn method(&self) -> &'static str {
        match self {
            ModeNotification::WorkspaceMode { .. } => "workspace_mode",
            ModeNotification::ProjectMode { .. } => "project_mode",
            ModeNotification::EnterKeySelect => "enter_key_select",
            ModeNotification::ArrowKeyNav { .. } => "arrow_key_nav",
            ModeNotification::HomeKeyNav => "home_key_nav",
            ModeNotification::EndKeyNav => "end_key_nav",
            ModeNotification::DeleteKeyClose => "delete_key_close",
            ModeNotification::WindowAction { .. } => "window_action",
        }
    }
}

/// Result of a committed mode execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecuteResult {
    Workspace {
        workspace: u32,
        output: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_monitor: Option<String>,
    },
    Project {
        project: String,
    },
    /// Empty input: selection handled by an external preview UI.
    Selection,
}

pub struct ModeManager {
    state: ModeState,
    output_roles: OutputRoles,
    history: VecDeque<WorkspaceSwitch>,
    wm: Arc<dyn WmCommander>,
    switcher: ProjectSwitcher,
    store: Arc<Mutex<StateStore>>,
    clock: Arc<dyn Clock>,
    notifications: mpsc::UnboundedSender<ModeNotification>,
}

impl ModeManager {
    pub fn new(
        wm: Arc<dyn WmCommander>,
        switcher: ProjectSwitcher,
        store: Arc<Mutex<StateStore>>,
        clock: Arc<dyn Clock>,
        notifications: mpsc::UnboundedSender<ModeNotification>,
    ) -> Self {
        Self {
            state: ModeState::Inactive,
            output_roles: OutputRoles::default(),
            history: VecDeque::new(),
            wm,
            switcher,
            store,
            clock,
            notifications,
        }
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ModeState::Active(_))
    }

    pub fn snapshot(&self) -> ModeSnapshot {
        match &self.state {
            ModeState::Inactive => ModeSnapshot {
                active: false,
                mode_type: None,
                input_type: InputType::None,
                accumulated_digits: String::new(),
                accumulated_chars: String::new(),
                output_cache: self.output_roles.clone(),
            },
            ModeState::Active(active) => ModeSnapshot {
                active: true,
                mode_type: Some(active.mode_type),
                input_type: active.input_type,
                accumulated_digits: active.digits.clone(),
                accumulated_chars: active.chars.clone(),
                output_cache: self.output_roles.clone(),
            },
        }
    }

    /// Enter goto/move/project mode. Refreshes the output role cache so
    /// pending-target derivation reflects the current monitor set.
    pub async fn enter(&mut self, mode_type: ModeType) -> Result<(), ModeError> {
        if self.is_active() {
            return Err(ModeError::AlreadyActive);
        }

        self.refresh_output_cache().await;

        let input_type = match mode_type {
            ModeType::Project => InputType::Project,
            _ => InputType::Workspace,
        };
        self.state = ModeState::Active(ActiveMode {
            mode_type,
            input_type,
            digits: String::new(),
            chars: String::new(),
            entered_at_ms: self.clock.now_ms(),
        });

        info!(mode = mode_type.as_str(), "entered mode");
        if mode_type == ModeType::Project {
            self.emit_project_mode("enter");
        } else {
            self.emit_workspace_mode("enter").await;
        }
        Ok(())
    }

    /// Append a digit (leading zeros ignored).
    pub async fn add_digit(&mut self, digit: char) -> Result<String, ModeError> {
        if !digit.is_ascii_digit() {
            return Err(ModeError::InvalidInput(format!("not a digit: {digit}")));
        }
        let ModeState::Active(active) = &mut self.state else {
            return Err(ModeError::NotActive);
        };

        if digit == '0' && active.digits.is_empty() {
            debug!("ignoring leading zero");
            return Ok(active.digits.clone());
        }

        active.digits.push(digit);
        active.input_type = InputType::Workspace;
        let digits = active.digits.clone();

        self.emit_workspace_mode("digit").await;
        Ok(digits)
    }

    /// Append a project-search character; `:` switches to project input
    /// and clears accumulated digits.
    pub fn add_char(&mut self, ch: char) -> Result<String, ModeError> {
        let ModeState::Active(active) = &mut self.state else {
            return Err(ModeError::NotActive);
        };

        if ch == ':' {
            active.digits.clear();
            active.chars.clear();
            active.input_type = InputType::Project;
            self.emit_project_mode("char");
            return Ok(String::new());
        }

        let lower = ch.to_ascii_lowercase();
        if !lower.is_ascii_lowercase() {
            return Err(ModeError::InvalidInput(format!(
                "not a letter or ':': {ch}"
            )));
        }

        active.chars.push(lower);
        active.input_type = InputType::Project;
        let chars = active.chars.clone();

        self.emit_project_mode("char");
        Ok(chars)
    }

    /// Remove the last character of the active buffer.
    pub async fn backspace(&mut self) -> Result<String, ModeError> {
        let ModeState::Active(active) = &mut self.state else {
            return Err(ModeError::NotActive);
        };

        match active.input_type {
            InputType::Project => {
                active.chars.pop();
                let chars = active.chars.clone();
                self.emit_project_mode("char");
                Ok(chars)
            }
            _ => {
                active.digits.pop();
                let digits = active.digits.clone();
                self.emit_workspace_mode("digit").await;
                Ok(digits)
            }
        }
    }

    /// Commit the accumulated input.
    pub async fn execute(&mut self) -> Result<ExecuteResult, ModeError> {
        let ModeState::Active(active) = self.state.clone() else {
            return Err(ModeError::NotActive);
        };

        // Selection UIs act on the bare Enter press
        self.emit(ModeNotification::EnterKeySelect);

        match active.input_type {
            InputType::Workspace if !active.digits.is_empty() => {
                self.execute_workspace(&active).await
            }
            InputType::Project if !active.chars.is_empty() => {
                self.execute_project(&active).await
            }
            _ => {
                self.run_wm("mode default").await?;
                self.emit_workspace_mode("execute").await;
                self.state = ModeState::Inactive;
                Ok(ExecuteResult::Selection)
            }
        }
    }

    async fn execute_workspace(&mut self, active: &ActiveMode) -> Result<ExecuteResult, ModeError> {
        let Some(target) = parse_workspace_digits(&active.digits) else {
            return Err(ModeError::InvalidInput(active.digits.clone()));
        };

        let output = match &target.monitor {
            Some(monitor) => monitor.clone(),
            None => self.output_for_workspace(target.workspace).await,
        };

        match active.mode_type {
            ModeType::Move => {
                let Some(monitor) = &target.monitor else {
                    // Move mode needs the third digit; keep the mode
                    // active so the user can finish or cancel
                    return Err(ModeError::InvalidInput(
                        "move mode requires workspace and monitor digits".to_string(),
                    ));
                };
                self.run_wm(&format!("workspace number {}", target.workspace))
                    .await?;
                self.run_wm(&format!("move workspace to output {monitor}"))
                    .await?;
                self.run_wm(&format!("workspace number {}", target.workspace))
                    .await?;
            }
            _ => {
                self.run_wm(&format!("workspace number {}", target.workspace))
                    .await?;
            }
        }

        self.run_wm("mode default").await?;
        self.record_switch(target.workspace, &output, active.mode_type);

        // Emit before reset so previews see the final pending state
        self.emit_workspace_mode("execute").await;
        self.state = ModeState::Inactive;

        Ok(ExecuteResult::Workspace {
            workspace: target.workspace,
            output,
            target_monitor: target.monitor,
        })
    }

    async fn execute_project(&mut self, active: &ActiveMode) -> Result<ExecuteResult, ModeError> {
        let names: Vec<String> = {
            let store = self.store.lock();
            store.projects.keys().cloned().collect()
        };

        let Some(matched) = fuzzy_match_project(&active.chars, &names).map(String::from) else {
            // No match: mode stays active for retry or cancel
            return Err(ModeError::NoMatch(active.chars.clone()));
        };

        info!(query = %active.chars, project = %matched, "project mode commit");
        self.switcher.switch(Some(matched.clone())).await?;
        self.run_wm("mode default").await?;

        self.emit_project_mode("execute");
        self.state = ModeState::Inactive;

        Ok(ExecuteResult::Project { project: matched })
    }

    /// Leave the mode without acting.
    pub async fn cancel(&mut self) -> Result<(), ModeError> {
        if !self.is_active() {
            return Err(ModeError::NotActive);
        }
        self.run_wm("mode default").await?;
        self.emit_workspace_mode("cancel").await;
        self.state = ModeState::Inactive;
        Ok(())
    }

    /// Navigation keys are forwarded to the selector UI untouched.
    pub fn nav(&mut self, direction: &str) -> Result<(), ModeError> {
        if !self.is_active() {
            return Err(ModeError::NotActive);
        }
        let notification = match direction {
            "home" => ModeNotification::HomeKeyNav,
            "end" => ModeNotification::EndKeyNav,
            "up" | "down" | "left" | "right" => ModeNotification::ArrowKeyNav {
                direction: direction.to_string(),
            },
            other => {
                return Err(ModeError::InvalidInput(format!(
                    "unknown direction: {other}"
                )))
            }
        };
        self.emit(notification);
        Ok(())
    }

    /// Delete key: selector UI closes the selected window.
    pub fn delete(&mut self) -> Result<(), ModeError> {
        if !self.is_active() {
            return Err(ModeError::NotActive);
        }
        self.emit(ModeNotification::DeleteKeyClose);
        Ok(())
    }

    /// Window action keys (`m`, `f`, `shift-m`).
    pub fn window_action(&mut self, action: &str) -> Result<(), ModeError> {
        if !self.is_active() {
            return Err(ModeError::NotActive);
        }
        match action {
            "m" | "f" | "shift-m" => {
                self.emit(ModeNotification::WindowAction {
                    action: action.to_string(),
                });
                Ok(())
            }
            other => Err(ModeError::InvalidInput(format!("unknown action: {other}"))),
        }
    }

    /// Recent executed switches, newest first.
    pub fn history(&self, limit: usize) -> Vec<WorkspaceSwitch> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    pub fn output_roles(&self) -> &OutputRoles {
        &self.output_roles
    }

    /// Refresh PRIMARY/SECONDARY/TERTIARY from active outputs.
    pub async fn refresh_output_cache(&mut self) {
        match self.wm.get_outputs().await {
            Ok(outputs) => {
                let active: Vec<String> = outputs
                    .into_iter()
                    .filter(|o| o.active)
                    .map(|o| o.name)
                    .collect();
                self.output_roles = OutputRoles::from_active_outputs(active);
            }
            Err(e) => {
                warn!(error = %e, "failed to refresh outputs, keeping cache");
            }
        }
    }

    async fn output_for_workspace(&self, workspace: u32) -> String {
        // An existing workspace answers authoritatively
        if let Ok(workspaces) = self.wm.get_workspaces().await {
            if let Some(ws) = workspaces.iter().find(|w| w.num == workspace as i32) {
                return ws.output.clone();
            }
        }
        self.output_roles.output_for_workspace(workspace).to_string()
    }

    async fn pending_workspace(&self) -> Option<PendingWorkspace> {
        let ModeState::Active(active) = &self.state else {
            return None;
        };
        let target = parse_workspace_digits(&active.digits)?;
        let output = match &target.monitor {
            Some(monitor) => monitor.clone(),
            None => self.output_for_workspace(target.workspace).await,
        };
        Some(PendingWorkspace {
            workspace_number: target.workspace,
            accumulated_digits: active.digits.clone(),
            mode_type: active.mode_type,
            target_output: output,
        })
    }

    fn record_switch(&mut self, workspace: u32, output: &str, mode_type: ModeType) {
        self.history.push_back(WorkspaceSwitch {
            workspace,
            output: output.to_string(),
            mode_type,
            timestamp_ms: self.clock.now_ms(),
        });
        if self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    async fn emit_workspace_mode(&self, event_type: &str) {
        let pending_workspace = self.pending_workspace().await;
        self.emit(ModeNotification::WorkspaceMode {
            event_type: event_type.to_string(),
            state: self.snapshot(),
            pending_workspace,
        });
    }

    fn emit_project_mode(&self, event_type: &str) {
        let query = match &self.state {
            ModeState::Active(active) => active.chars.clone(),
            ModeState::Inactive => String::new(),
        };
        let projects: Vec<(String, String, String)> = {
            let store = self.store.lock();
            store
                .projects
                .values()
                .map(|p| (p.name.clone(), p.label().to_string(), p.icon.clone()))
                .collect()
        };
        self.emit(ModeNotification::ProjectMode {
            event_type: event_type.to_string(),
            state: self.snapshot(),
            projects: filter_projects(&projects, &query),
        });
    }

    fn emit(&self, notification: ModeNotification) {
        let _ = self.notifications.send(notification);
    }

    async fn run_wm(&self, command: &str) -> Result<(), ModeError> {
        self.wm.run_command(command).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mode_manager_tests.rs"]
mod tests;
