// SPDX-License-Identifier: MIT

//! Event router for the window-project daemon.
//!
//! Single consumer of the WM event stream: translates raw events into
//! domain events, updates the state store, drives identity resolution,
//! rules, launch correlation and the mode manager, and feeds the ring.
//! Handler errors are logged and counted; processing always continues
//! with the next event.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use i3pm_core::{Clock, Event, EventRing, ModeType, RingEntry, Scope, Source, WindowRecord};
use i3pm_engine::{IdentityResolver, LaunchRegistry, ModeManager, RuleEngine};
use i3pm_storage::{
    load_classification, load_window_rules, save_focus_state, StateStore, WorkspaceTracker,
};
use i3pm_wm::{
    Node, ShutdownEvent, TickEvent, WindowEvent, WmCommander, WmEvent, WorkspaceEvent,
};

use crate::listener::Broadcaster;

/// Delay between consecutive startup-scan mark commands.
pub const STARTUP_MARK_DELAY_MS: u64 = 50;

/// Tick payload requesting a configuration reload.
pub const RELOAD_TICK_PAYLOAD: &str = "i3pm:reload-config";

/// What the main loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterFlow {
    Continue,
    /// WM is restarting: reconnect and rebuild.
    Reconnect,
    /// WM exited: drain and terminate.
    Exit,
}

/// Config file locations the router reloads from.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub app_classes: PathBuf,
    pub window_rules: PathBuf,
    pub focus_state: PathBuf,
}

pub struct Router {
    wm: Arc<dyn WmCommander>,
    state: Arc<Mutex<StateStore>>,
    tracker: Arc<Mutex<WorkspaceTracker>>,
    ring: Arc<Mutex<EventRing>>,
    broadcaster: Broadcaster,
    rules: RuleEngine,
    resolver: IdentityResolver,
    registry: Arc<Mutex<LaunchRegistry>>,
    mode: Arc<tokio::sync::Mutex<ModeManager>>,
    clock: Arc<dyn Clock>,
    paths: ConfigPaths,
    /// Classes marked last during startup scans (mark-clearing race).
    pub mark_race_classes: BTreeSet<String>,
}

#[allow(clippy::too_many_arguments)]
impl Router {
    pub fn new(
        wm: Arc<dyn WmCommander>,
        state: Arc<Mutex<StateStore>>,
        tracker: Arc<Mutex<WorkspaceTracker>>,
        ring: Arc<Mutex<EventRing>>,
        broadcaster: Broadcaster,
        rules: RuleEngine,
        resolver: IdentityResolver,
        registry: Arc<Mutex<LaunchRegistry>>,
        mode: Arc<tokio::sync::Mutex<ModeManager>>,
        clock: Arc<dyn Clock>,
        paths: ConfigPaths,
    ) -> Self {
        let mut mark_race_classes = BTreeSet::new();
        mark_race_classes.insert("Code".to_string());
        Self {
            wm,
            state,
            tracker,
            ring,
            broadcaster,
            rules,
            resolver,
            registry,
            mode,
            clock,
            paths,
            mark_race_classes,
        }
    }

    /// Append a domain event to the ring and fan it out.
    pub fn record_event(&self, event: Event, source: Source) -> RingEntry {
        let entry = {
            let mut ring = self.ring.lock();
            ring.add(event, source, self.clock.now_ms())
        };
        {
            let mut state = self.state.lock();
            state.increment_event_count();
        }
        self.broadcaster.broadcast_event(&entry);
        entry
    }

    fn record_error(&self, context: &str, error: impl std::fmt::Display) {
        error!(context, error = %error, "event handler error");
        let mut state = self.state.lock();
        state.increment_error_count();
    }

    /// Process one WM event.
    pub async fn handle_wm_event(&self, event: WmEvent) -> RouterFlow {
        match event {
            WmEvent::Window(e) => {
                if let Err(err) = self.handle_window_event(&e).await {
                    self.record_error("window", err);
                }
            }
            WmEvent::Workspace(e) => self.handle_workspace_event(&e),
            WmEvent::Output(e) => {
                self.handle_output_event().await;
                debug!(change = e.change, "output event");
            }
            WmEvent::Mode(e) => {
                if let Err(err) = self.handle_mode_event(&e.change).await {
                    self.record_error("mode", err);
                }
            }
            WmEvent::Binding(_) => {
                // The project daemon does not subscribe to binding events
            }
            WmEvent::Tick(e) => self.handle_tick(&e),
            WmEvent::Shutdown(e) => return self.handle_shutdown(&e),
        }
        RouterFlow::Continue
    }

    async fn handle_window_event(&self, event: &WindowEvent) -> Result<(), String> {
        let container = &event.container;
        match event.change.as_str() {
            "new" => self.on_window_new(container).await,
            "close" => {
                self.on_window_close(container);
                Ok(())
            }
            "focus" => {
                self.on_window_focus(container);
                Ok(())
            }
            "title" => self.on_window_title(container).await,
            "move" => self.on_window_move(container).await,
            "floating" => {
                let floating = container.is_floating();
                self.state
                    .lock()
                    .update_window(container.id, |w| w.floating = floating);
                self.record_event(
                    Event::WindowFloating {
                        con_id: container.id,
                        floating,
                    },
                    Source::Wm,
                );
                Ok(())
            }
            "fullscreen_mode" => {
                let fullscreen = container.fullscreen_mode.unwrap_or(0) != 0;
                self.record_event(
                    Event::WindowFullscreen {
                        con_id: container.id,
                        fullscreen,
                    },
                    Source::Wm,
                );
                Ok(())
            }
            "mark" => {
                self.on_window_mark(container);
                Ok(())
            }
            other => {
                debug!(change = other, "unhandled window change");
                Ok(())
            }
        }
    }

    async fn on_window_new(&self, container: &Node) -> Result<(), String> {
        let now_ms = self.clock.now_ms();
        let (known_projects, classification) = {
            let state = self.state.lock();
            (
                state.projects.keys().cloned().collect::<BTreeSet<_>>(),
                state.classification.clone(),
            )
        };

        let identity = self
            .resolver
            .resolve(container, &known_projects, &classification)
            .await;

        // Attribute the window to a pending launch where possible
        let workspace_num = self.workspace_of(container).await;
        let launch_match = {
            let mut registry = self.registry.lock();
            registry.find_match(container.window_class(), workspace_num)
        };

        let (project, app, scope, correlation) = match (&identity.project, launch_match) {
            // Environment/title identity is authoritative; keep the
            // correlation as metadata
            (Some(project), matched) => (
                Some(project.clone()),
                identity.app.clone(),
                identity.scope,
                matched.map(|m| m.correlation),
            ),
            (None, Some(matched)) => (
                matched.launch.project.clone(),
                matched.launch.app_name.clone(),
                Scope::Scoped,
                Some(matched.correlation),
            ),
            (None, None) => (None, identity.app.clone(), identity.scope, None),
        };

        let mut marks = Vec::new();
        if let Some(project) = &project {
            let mark = i3pm_core::build_mark(scope, &app, project, container.id);
            self.apply_mark(container.id, &mark).await;
            marks.push(mark);
            if let Some(context_mark) = identity.context_mark() {
                self.apply_mark(container.id, &context_mark).await;
                marks.push(context_mark);
            }
        }
        marks.extend(container.marks.iter().cloned());

        let record = WindowRecord {
            con_id: container.id,
            surface_id: container.window,
            class: container.window_class().to_string(),
            instance: container.window_instance().to_string(),
            title: container.name.clone().unwrap_or_default(),
            app_identifier: app.clone(),
            project: project.clone(),
            scope,
            marks,
            workspace: workspace_num.map(|n| n.to_string()),
            output: None,
            floating: container.is_floating(),
            created_at_ms: now_ms,
            last_focused_at_ms: None,
            correlation: correlation.clone(),
        };

        {
            let mut state = self.state.lock();
            state.add_window(record.clone());
        }

        // Rules run after identity so mark/project criteria see the final
        // record
        let outcomes = self.rules.apply(self.wm.as_ref(), &record).await;
        for outcome in &outcomes {
            if !outcome.success {
                warn!(
                    con_id = record.con_id,
                    action = %outcome.action,
                    error = ?outcome.error,
                    "rule action failed"
                );
            }
        }

        self.record_event(
            Event::WindowNew {
                con_id: record.con_id,
                class: record.class.clone(),
                title: record.title.clone(),
                workspace: record.workspace.clone(),
                project,
                app: Some(app),
                correlation,
            },
            Source::Wm,
        );
        Ok(())
    }

    fn on_window_close(&self, container: &Node) {
        let removed = {
            let mut state = self.state.lock();
            state.remove_window(container.id)
        };
        {
            let mut tracker = self.tracker.lock();
            if tracker.remove(container.id) {
                self.save_tracker_async();
            }
        }

        self.record_event(
            Event::WindowClose {
                con_id: container.id,
                class: removed
                    .as_ref()
                    .map(|w| w.class.clone())
                    .unwrap_or_else(|| container.window_class().to_string()),
                project: removed.and_then(|w| w.project),
            },
            Source::Wm,
        );
    }

    fn on_window_focus(&self, container: &Node) {
        let now_ms = self.clock.now_ms();
        let focus_snapshot = {
            let mut state = self.state.lock();
            state.update_window(container.id, |w| w.last_focused_at_ms = Some(now_ms));

            let workspace_num = state
                .get_window(container.id)
                .and_then(|w| w.workspace)
                .and_then(|ws| ws.parse::<i32>().ok());
            if let Some(num) = workspace_num {
                state.set_focused_window(num, container.id);
                if let Some(project) = state.active_project().map(String::from) {
                    state.set_focused_workspace(&project, num);
                }
            }
            state.focus.clone()
        };

        // Focus memory persists off the event loop
        let path = self.paths.focus_state.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = save_focus_state(&path, &focus_snapshot) {
                warn!(error = %e, "failed to persist focus state");
            }
        });

        let workspace = {
            let state = self.state.lock();
            state.get_window(container.id).and_then(|w| w.workspace)
        };
        self.record_event(
            Event::WindowFocus {
                con_id: container.id,
                workspace,
            },
            Source::Wm,
        );
    }

    async fn on_window_title(&self, container: &Node) -> Result<(), String> {
        let title = container.name.clone().unwrap_or_default();
        let record = {
            let mut state = self.state.lock();
            state.update_window(container.id, |w| w.title = title.clone());
            state.get_window(container.id)
        };

        // Title-based rule patterns may newly match
        if let Some(record) = record {
            self.rules.apply(self.wm.as_ref(), &record).await;
        }

        self.record_event(
            Event::WindowTitle {
                con_id: container.id,
                title,
            },
            Source::Wm,
        );
        Ok(())
    }

    async fn on_window_move(&self, container: &Node) -> Result<(), String> {
        let workspace_num = self.workspace_of(container).await;
        let workspace = workspace_num.map(|n| n.to_string());
        {
            let mut state = self.state.lock();
            let workspace = workspace.clone();
            state.update_window(container.id, |w| w.workspace = workspace);
        }
        self.record_event(
            Event::WindowMove {
                con_id: container.id,
                workspace,
            },
            Source::Wm,
        );
        Ok(())
    }

    fn on_window_mark(&self, container: &Node) {
        let marks = container.marks.clone();
        {
            let mut state = self.state.lock();
            state.update_window(container.id, |w| {
                w.marks = marks.clone();
                // Marks are authoritative for project association
                if let Some(parsed) = marks.iter().find_map(|m| i3pm_core::ParsedMark::parse(m)) {
                    w.project = Some(parsed.project);
                    w.scope = parsed.scope;
                    w.app_identifier = parsed.app;
                }
            });
        }
        self.record_event(
            Event::WindowMark {
                con_id: container.id,
                marks,
            },
            Source::Wm,
        );
    }

    fn handle_workspace_event(&self, event: &WorkspaceEvent) {
        let current = event.current.as_ref();
        let name = current
            .and_then(|n| n.name.clone())
            .unwrap_or_default();
        let num = current.and_then(|n| n.num);

        match event.change.as_str() {
            "init" => {
                if let Some(node) = current {
                    let mut state = self.state.lock();
                    state.add_workspace(i3pm_wm::WorkspaceInfo {
                        name: name.clone(),
                        num: num.unwrap_or(-1),
                        output: node.output.clone().unwrap_or_default(),
                        ..Default::default()
                    });
                }
                self.record_event(
                    Event::WorkspaceInit {
                        name,
                        num,
                        output: current.and_then(|n| n.output.clone()),
                    },
                    Source::Wm,
                );
            }
            "empty" => {
                {
                    let mut state = self.state.lock();
                    state.remove_workspace(&name);
                }
                self.record_event(Event::WorkspaceEmpty { name }, Source::Wm);
            }
            "focus" => {
                {
                    let mut state = self.state.lock();
                    if let (Some(num), Some(project)) =
                        (num, state.active_project().map(String::from))
                    {
                        state.set_focused_workspace(&project, num);
                    }
                }
                self.record_event(Event::WorkspaceFocus { name, num }, Source::Wm);
            }
            "move" => {
                self.record_event(
                    Event::WorkspaceMove {
                        name,
                        output: current.and_then(|n| n.output.clone()),
                    },
                    Source::Wm,
                );
            }
            other => debug!(change = other, "unhandled workspace change"),
        }
    }

    async fn handle_output_event(&self) {
        // Re-derive output roles; preview targets follow the new layout
        {
            let mut mode = self.mode.lock().await;
            mode.refresh_output_cache().await;
        }

        let active_outputs = match self.wm.get_outputs().await {
            Ok(outputs) => outputs
                .into_iter()
                .filter(|o| o.active)
                .map(|o| o.name)
                .collect(),
            Err(e) => {
                self.record_error("output", e);
                Vec::new()
            }
        };

        self.record_event(Event::OutputChange { active_outputs }, Source::Wm);
    }

    async fn handle_mode_event(&self, change: &str) -> Result<(), String> {
        self.record_event(
            Event::ModeChange {
                mode: change.to_string(),
            },
            Source::Wm,
        );

        let mut mode = self.mode.lock().await;
        match mode_type_for(change) {
            Some(mode_type) => {
                if !mode.is_active() {
                    mode.enter(mode_type).await.map_err(|e| e.to_string())?;
                }
            }
            None if change == "default" => {
                if mode.is_active() {
                    // The WM already left the mode; just reset our FSM
                    let _ = mode.cancel().await;
                }
            }
            None => debug!(change, "unmapped WM mode"),
        }
        Ok(())
    }

    fn handle_tick(&self, event: &TickEvent) {
        if event.first {
            return;
        }
        if event.payload == RELOAD_TICK_PAYLOAD {
            self.reload_config();
        }
        self.record_event(
            Event::Tick {
                payload: event.payload.clone(),
            },
            Source::Wm,
        );
    }

    fn handle_shutdown(&self, event: &ShutdownEvent) -> RouterFlow {
        match event.change.as_str() {
            "restart" => {
                info!("WM restarting, scheduling reconnect");
                RouterFlow::Reconnect
            }
            "exit" => {
                info!("WM exited, shutting down");
                RouterFlow::Exit
            }
            other => {
                warn!(change = other, "unknown shutdown change");
                RouterFlow::Continue
            }
        }
    }

    /// Reload classification and window rules from disk.
    pub fn reload_config(&self) {
        match load_classification(&self.paths.app_classes) {
            Ok(classification) => {
                let mut state = self.state.lock();
                state.classification = classification;
            }
            Err(e) => warn!(error = %e, "classification reload failed, keeping previous"),
        }
        match load_window_rules(&self.paths.window_rules) {
            Ok(rules) => {
                info!(count = rules.len(), "window rules reloaded");
                self.rules.swap(rules);
            }
            Err(e) => warn!(error = %e, "window rules reload failed, keeping previous"),
        }
        self.record_event(
            Event::ConfigReload {
                kind: "classification+rules".to_string(),
            },
            Source::Daemon,
        );
    }

    /// Rebuild in-memory state from a fresh tree (connect/reconnect).
    pub async fn rebuild_state(&self) -> Result<usize, String> {
        let tree = self.wm.get_tree().await.map_err(|e| e.to_string())?;
        let recovered = {
            let mut state = self.state.lock();
            state.rebuild_from_marks(&tree, self.clock.now_ms())
        };

        if let Ok(workspaces) = self.wm.get_workspaces().await {
            let mut state = self.state.lock();
            for ws in workspaces {
                state.add_workspace(ws);
            }
        }

        info!(recovered, "state rebuilt from marks");
        Ok(recovered)
    }

    /// Mark pre-existing windows that carry derivable identity but no
    /// project mark yet. Mark-race classes go last, and consecutive mark
    /// commands are spaced by [`STARTUP_MARK_DELAY_MS`].
    pub async fn startup_scan(&self) -> Result<usize, String> {
        let tree = self.wm.get_tree().await.map_err(|e| e.to_string())?;
        let (known_projects, classification) = {
            let state = self.state.lock();
            (
                state.projects.keys().cloned().collect::<BTreeSet<_>>(),
                state.classification.clone(),
            )
        };

        struct PendingMark {
            con_id: i64,
            surface_id: Option<i64>,
            class: String,
            instance: String,
            title: String,
            workspace: Option<String>,
            floating: bool,
            mark: String,
            context_mark: Option<String>,
            app: String,
            project: String,
            scope: Scope,
        }

        let mut to_mark: Vec<PendingMark> = Vec::new();
        for (window, workspace) in tree.windows_with_workspaces() {
            if window.marks.iter().any(|m| i3pm_core::is_project_mark(m)) {
                continue;
            }

            let identity = self
                .resolver
                .resolve(window, &known_projects, &classification)
                .await;
            let Some(project) = identity.project.clone() else {
                continue;
            };
            let Some(mark) = identity.mark(window.id) else {
                continue;
            };

            to_mark.push(PendingMark {
                con_id: window.id,
                surface_id: window.window,
                class: window.window_class().to_string(),
                instance: window.window_instance().to_string(),
                title: window.name.clone().unwrap_or_default(),
                workspace: workspace.and_then(|w| w.name.clone()),
                floating: window.is_floating(),
                context_mark: identity.context_mark(),
                app: identity.app.clone(),
                project,
                scope: identity.scope,
                mark,
            });
        }

        // Deterministic order, race-prone classes last
        to_mark.sort_by_key(|w| {
            (
                self.mark_race_classes.contains(&w.class),
                w.class.clone(),
                w.con_id,
            )
        });

        let total = to_mark.len();
        for (i, pending) in to_mark.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(STARTUP_MARK_DELAY_MS)).await;
            }

            self.apply_mark(pending.con_id, &pending.mark).await;
            if let Some(context_mark) = &pending.context_mark {
                self.apply_mark(pending.con_id, context_mark).await;
            }

            let mut marks = vec![pending.mark.clone()];
            marks.extend(pending.context_mark.clone());
            let record = WindowRecord {
                con_id: pending.con_id,
                surface_id: pending.surface_id,
                class: pending.class,
                instance: pending.instance,
                title: pending.title,
                app_identifier: pending.app,
                project: Some(pending.project),
                scope: pending.scope,
                marks,
                workspace: pending.workspace,
                output: None,
                floating: pending.floating,
                created_at_ms: self.clock.now_ms(),
                last_focused_at_ms: None,
                correlation: None,
            };
            let mut state = self.state.lock();
            state.add_window(record);
        }

        info!(marked = total, "startup scan complete");
        Ok(total)
    }

    async fn apply_mark(&self, con_id: i64, mark: &str) {
        let command = format!("[con_id={con_id}] mark --add \"{mark}\"");
        match self.wm.run_command(&command).await {
            Ok(results) => {
                if let Some(failed) = results.iter().find(|r| !r.success) {
                    warn!(con_id, mark, error = ?failed.error, "mark command failed");
                }
            }
            Err(e) => self.record_error("mark", e),
        }
    }

    async fn workspace_of(&self, container: &Node) -> Option<i32> {
        let tree = self.wm.get_tree().await.ok()?;
        tree.windows_with_workspaces()
            .into_iter()
            .find(|(w, _)| w.id == container.id)
            .and_then(|(_, ws)| ws.and_then(|n| n.num))
    }

    fn save_tracker_async(&self) {
        let doc = {
            let tracker = self.tracker.lock();
            (tracker.path().to_path_buf(), tracker.to_doc())
        };
        tokio::task::spawn_blocking(move || {
            if let Err(e) = i3pm_storage::save_json(&doc.0, &doc.1) {
                warn!(error = %e, "failed to persist workspace tracker");
            }
        });
    }
}

/// Map a WM mode name to a transient mode type.
pub fn mode_type_for(change: &str) -> Option<ModeType> {
    match change {
        "goto" | "workspace-goto" => Some(ModeType::Goto),
        "move" | "workspace-move" => Some(ModeType::Move),
        "project" | "project-select" => Some(ModeType::Project),
        _ => None,
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
