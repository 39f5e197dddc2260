// SPDX-License-Identifier: MIT

//! Materialized daemon state.
//!
//! One plain struct owns the window map, workspace index, project
//! configuration, classification, focus memory, and the active-project
//! pointer. The daemon shares it behind a single `Mutex` that is never
//! held across suspension points; every method here is synchronous.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use i3pm_core::{
    parse_legacy_mark, Classification, ParsedMark, ProjectConfig, Scope, WindowRecord,
};
use i3pm_wm::{Node, WorkspaceInfo};

/// Focus memory: per-project focused workspace, per-workspace focused
/// window. Persisted across restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FocusState {
    #[serde(default)]
    pub workspace_by_project: HashMap<String, i32>,
    #[serde(default)]
    pub window_by_workspace: HashMap<i32, i64>,
}

/// Counters exposed via `get_status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateStats {
    pub window_count: usize,
    pub workspace_count: usize,
    pub project_count: usize,
    pub event_count: u64,
    pub error_count: u64,
}

/// The authoritative in-memory state of the window-project daemon.
#[derive(Debug, Default)]
pub struct StateStore {
    windows: HashMap<i64, WindowRecord>,
    workspaces: HashMap<String, WorkspaceInfo>,
    pub projects: BTreeMap<String, ProjectConfig>,
    pub classification: Classification,
    active_project: Option<String>,
    previous_project: Option<String>,
    pub focus: FocusState,
    pub connected: bool,
    event_count: u64,
    error_count: u64,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- windows --

    /// Insert or replace a window record (con_id is unique).
    pub fn add_window(&mut self, record: WindowRecord) {
        self.windows.insert(record.con_id, record);
    }

    pub fn remove_window(&mut self, con_id: i64) -> Option<WindowRecord> {
        self.windows.remove(&con_id)
    }

    pub fn get_window(&self, con_id: i64) -> Option<WindowRecord> {
        self.windows.get(&con_id).cloned()
    }

    pub fn has_window(&self, con_id: i64) -> bool {
        self.windows.contains_key(&con_id)
    }

    /// Apply an in-place update to a window record.
    pub fn update_window(&mut self, con_id: i64, update: impl FnOnce(&mut WindowRecord)) -> bool {
        match self.windows.get_mut(&con_id) {
            Some(record) => {
                update(record);
                true
            }
            None => false,
        }
    }

    pub fn windows(&self) -> Vec<WindowRecord> {
        let mut all: Vec<WindowRecord> = self.windows.values().cloned().collect();
        all.sort_by_key(|w| w.con_id);
        all
    }

    pub fn windows_by_project(&self, project: &str) -> Vec<WindowRecord> {
        let mut matching: Vec<WindowRecord> = self
            .windows
            .values()
            .filter(|w| w.project.as_deref() == Some(project))
            .cloned()
            .collect();
        matching.sort_by_key(|w| w.con_id);
        matching
    }

    /// Live scoped windows of a project (the hide/restore set for
    /// switches).
    pub fn scoped_windows_of(&self, project: &str) -> Vec<WindowRecord> {
        self.windows_by_project(project)
            .into_iter()
            .filter(|w| w.scope == Scope::Scoped)
            .collect()
    }

    pub fn window_count_of(&self, project: &str) -> usize {
        self.windows
            .values()
            .filter(|w| w.project.as_deref() == Some(project))
            .count()
    }

    // -- workspaces --

    pub fn add_workspace(&mut self, info: WorkspaceInfo) {
        self.workspaces.insert(info.name.clone(), info);
    }

    pub fn remove_workspace(&mut self, name: &str) -> bool {
        self.workspaces.remove(name).is_some()
    }

    pub fn workspaces(&self) -> Vec<WorkspaceInfo> {
        let mut all: Vec<WorkspaceInfo> = self.workspaces.values().cloned().collect();
        all.sort_by_key(|w| w.num);
        all
    }

    // -- active project --

    pub fn active_project(&self) -> Option<&str> {
        self.active_project.as_deref()
    }

    pub fn previous_project(&self) -> Option<&str> {
        self.previous_project.as_deref()
    }

    /// Move the active-project pointer; the old value becomes previous.
    pub fn set_active_project(&mut self, project: Option<String>) {
        self.previous_project = self.active_project.take();
        self.active_project = project;
    }

    // -- focus memory --

    pub fn focused_workspace(&self, project: &str) -> Option<i32> {
        self.focus.workspace_by_project.get(project).copied()
    }

    pub fn set_focused_workspace(&mut self, project: &str, workspace: i32) {
        self.focus
            .workspace_by_project
            .insert(project.to_string(), workspace);
    }

    pub fn focused_window(&self, workspace: i32) -> Option<i64> {
        self.focus.window_by_workspace.get(&workspace).copied()
    }

    pub fn set_focused_window(&mut self, workspace: i32, con_id: i64) {
        self.focus.window_by_workspace.insert(workspace, con_id);
    }

    // -- counters --

    pub fn increment_event_count(&mut self) {
        self.event_count += 1;
    }

    pub fn increment_error_count(&mut self) {
        self.error_count += 1;
    }

    pub fn stats(&self) -> StateStats {
        StateStats {
            window_count: self.windows.len(),
            workspace_count: self.workspaces.len(),
            project_count: self.projects.len(),
            event_count: self.event_count,
            error_count: self.error_count,
        }
    }

    // -- rebuild --

    /// Repopulate the window map from project marks found in a fresh tree.
    ///
    /// Canonical `scope:app:project:con_id` marks are authoritative;
    /// legacy `project:<name>` marks are honored with class-derived app
    /// identity. Returns the number of windows recovered.
    pub fn rebuild_from_marks(&mut self, tree: &Node, now_ms: u64) -> usize {
        self.windows.clear();

        let mut recovered = 0;
        for (window, workspace) in tree.windows_with_workspaces() {
            let parsed = window.marks.iter().find_map(|m| ParsedMark::parse(m));
            let legacy = window
                .marks
                .iter()
                .find_map(|m| parse_legacy_mark(m).map(String::from));

            let (scope, app, project) = match (parsed, legacy) {
                (Some(mark), _) => (mark.scope, mark.app, Some(mark.project)),
                (None, Some(project)) => (
                    Scope::Scoped,
                    window.window_class().to_string(),
                    Some(project),
                ),
                (None, None) => continue,
            };

            let record = WindowRecord {
                con_id: window.id,
                surface_id: window.window,
                class: window.window_class().to_string(),
                instance: window.window_instance().to_string(),
                title: window.name.clone().unwrap_or_default(),
                app_identifier: app,
                project,
                scope,
                marks: window.marks.clone(),
                workspace: workspace.and_then(|w| w.name.clone()),
                output: workspace.and_then(|w| w.output.clone()),
                floating: window.is_floating(),
                created_at_ms: now_ms,
                last_focused_at_ms: None,
                correlation: None,
            };
            self.add_window(record);
            recovered += 1;
        }

        recovered
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
