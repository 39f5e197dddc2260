// SPDX-License-Identifier: MIT

//! Typed view of the WM tree and query replies.
//!
//! Only the fields the daemons consume are modeled; the tree-diff engine
//! works on the raw JSON instead (`WmConnection::get_tree_raw`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One container in the WM tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// X11 window ID (absent for native Wayland surfaces).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<i64>,
    /// Wayland app identifier (absent under plain i3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_properties: Option<WindowProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floating: Option<String>,
    /// 0 none, 1 fullscreen on output, 2 global fullscreen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullscreen_mode: Option<u8>,
    #[serde(default)]
    pub marks: Vec<String>,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub floating_nodes: Vec<Node>,
}

impl Node {
    /// Whether this container holds an actual window (X11 or Wayland).
    pub fn is_window(&self) -> bool {
        self.window.is_some() || self.app_id.is_some()
    }

    /// Window class, i3/Sway compatible: `app_id` first (native Wayland),
    /// then `window_properties.class` (X11/XWayland), else `"unknown"`.
    pub fn window_class(&self) -> &str {
        if let Some(app_id) = &self.app_id {
            if !app_id.is_empty() {
                return app_id;
            }
        }
        if let Some(props) = &self.window_properties {
            if let Some(class) = &props.class {
                if !class.is_empty() {
                    return class;
                }
            }
        }
        "unknown"
    }

    pub fn window_instance(&self) -> &str {
        self.window_properties
            .as_ref()
            .and_then(|p| p.instance.as_deref())
            .unwrap_or("")
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.floating.as_deref(), Some("user_on") | Some("auto_on"))
    }

    /// Depth-first visit over regular and floating children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.nodes.iter().chain(self.floating_nodes.iter()) {
            child.walk(visit);
        }
    }

    /// All window containers, paired with the workspace they sit on.
    pub fn windows_with_workspaces(&self) -> Vec<(&Node, Option<&Node>)> {
        let mut out = Vec::new();
        collect_windows(self, None, &mut out);
        out
    }

    pub fn find(&self, con_id: i64) -> Option<&Node> {
        let mut found = None;
        self.walk(&mut |n| {
            if n.id == con_id && found.is_none() {
                found = Some(n);
            }
        });
        found
    }

    /// con_ids of every window in the tree.
    pub fn window_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        self.walk(&mut |n| {
            if n.is_window() {
                ids.push(n.id);
            }
        });
        ids
    }
}

fn collect_windows<'a>(
    node: &'a Node,
    workspace: Option<&'a Node>,
    out: &mut Vec<(&'a Node, Option<&'a Node>)>,
) {
    let workspace = if node.node_type == "workspace" {
        Some(node)
    } else {
        workspace
    };
    if node.is_window() {
        out.push((node, workspace));
    }
    for child in node.nodes.iter().chain(node.floating_nodes.iter()) {
        collect_windows(child, workspace, out);
    }
}

/// Reply element of `GET_WORKSPACES`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub name: String,
    #[serde(default)]
    pub num: i32,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub rect: Rect,
}

/// Reply element of `GET_OUTPUTS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_workspace: Option<String>,
    #[serde(default)]
    pub rect: Rect,
}

/// Reply element of `RUN_COMMAND`: per-sub-command success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply of `GET_VERSION`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
    #[serde(default)]
    pub patch: u32,
    #[serde(default)]
    pub human_readable: String,
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
