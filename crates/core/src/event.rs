// SPDX-License-Identifier: MIT

//! Domain events recorded in the event ring and broadcast to subscribers.
//!
//! Serializes with `{"type": "window::new", ...fields}` format; the type
//! strings double as the `event_type` filter keys for ring queries.

use crate::causality::EventCorrelation;
use crate::launch::LaunchCorrelation;
use serde::{Deserialize, Serialize};

/// Where an event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Window-manager IPC stream
    Wm,
    /// Local RPC socket
    Ipc,
    /// The daemon itself (startup, sweeps, switches)
    Daemon,
    /// Service manager (socket activation, watchdog)
    Systemd,
    /// `/proc` derived observations
    Proc,
}

/// Events recorded by the daemons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- window --
    #[serde(rename = "window::new")]
    WindowNew {
        con_id: i64,
        class: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workspace: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        app: Option<String>,
        /// Present when the window was attributed to a pending launch.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation: Option<LaunchCorrelation>,
    },

    #[serde(rename = "window::close")]
    WindowClose {
        con_id: i64,
        class: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<String>,
    },

    #[serde(rename = "window::focus")]
    WindowFocus {
        con_id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workspace: Option<String>,
    },

    #[serde(rename = "window::title")]
    WindowTitle { con_id: i64, title: String },

    #[serde(rename = "window::move")]
    WindowMove {
        con_id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workspace: Option<String>,
    },

    #[serde(rename = "window::floating")]
    WindowFloating { con_id: i64, floating: bool },

    #[serde(rename = "window::fullscreen_mode")]
    WindowFullscreen { con_id: i64, fullscreen: bool },

    #[serde(rename = "window::mark")]
    WindowMark { con_id: i64, marks: Vec<String> },

    // -- workspace --
    #[serde(rename = "workspace::init")]
    WorkspaceInit {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        num: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    #[serde(rename = "workspace::empty")]
    WorkspaceEmpty { name: String },

    #[serde(rename = "workspace::focus")]
    WorkspaceFocus {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        num: Option<i32>,
    },

    #[serde(rename = "workspace::move")]
    WorkspaceMove {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    // -- output / mode / signalling --
    #[serde(rename = "output::change")]
    OutputChange { active_outputs: Vec<String> },

    #[serde(rename = "mode::change")]
    ModeChange { mode: String },

    #[serde(rename = "tick")]
    Tick { payload: String },

    #[serde(rename = "binding::run")]
    BindingRun {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        symbol: Option<String>,
    },

    // -- daemon --
    #[serde(rename = "project::switch")]
    ProjectSwitch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new: Option<String>,
        windows_hidden: usize,
        windows_restored: usize,
        duration_ms: u64,
    },

    #[serde(rename = "config::reload")]
    ConfigReload { kind: String },

    #[serde(rename = "ipc::query")]
    IpcQuery { method: String },

    #[serde(rename = "daemon::start")]
    DaemonStart { version: String },

    #[serde(rename = "daemon::stop")]
    DaemonStop,

    // -- tree-diff daemon --
    #[serde(rename = "tree::diff")]
    TreeChanged {
        diff_id: u64,
        before_snapshot_id: u64,
        after_snapshot_id: u64,
        change_count: usize,
        significance: f64,
        computation_time_ms: f64,
        event_source: String,
        /// Best causal attribution to a preceding user action, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation: Option<EventCorrelation>,
    },
}

impl Event {
    /// The wire/type string, used as the filter key in ring queries.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::WindowNew { .. } => "window::new",
            Event::WindowClose { .. } => "window::close",
            Event::WindowFocus { .. } => "window::focus",
            Event::WindowTitle { .. } => "window::title",
            Event::WindowMove { .. } => "window::move",
            Event::WindowFloating { .. } => "window::floating",
            Event::WindowFullscreen { .. } => "window::fullscreen_mode",
            Event::WindowMark { .. } => "window::mark",
            Event::WorkspaceInit { .. } => "workspace::init",
            Event::WorkspaceEmpty { .. } => "workspace::empty",
            Event::WorkspaceFocus { .. } => "workspace::focus",
            Event::WorkspaceMove { .. } => "workspace::move",
            Event::OutputChange { .. } => "output::change",
            Event::ModeChange { .. } => "mode::change",
            Event::Tick { .. } => "tick",
            Event::BindingRun { .. } => "binding::run",
            Event::ProjectSwitch { .. } => "project::switch",
            Event::ConfigReload { .. } => "config::reload",
            Event::IpcQuery { .. } => "ipc::query",
            Event::DaemonStart { .. } => "daemon::start",
            Event::DaemonStop => "daemon::stop",
            Event::TreeChanged { .. } => "tree::diff",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
