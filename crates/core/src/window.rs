// SPDX-License-Identifier: MIT

//! Window records and the mark grammar.
//!
//! Marks are the authoritative, WM-side source of a window's project
//! association. The canonical form is `<scope>:<app>:<project>:<con_id>`;
//! an optional `ctx:<key>` mark carries a context key, and the legacy
//! `project:<name>` form is still recognized on startup scans.

use serde::{Deserialize, Serialize};

use crate::launch::LaunchCorrelation;

/// Whether a window is tied to a project or visible everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Scoped,
    Global,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Scoped => "scoped",
            Scope::Global => "global",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scoped" => Some(Scope::Scoped),
            "global" => Some(Scope::Global),
            _ => None,
        }
    }
}

/// Live window state, keyed by container ID in the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    /// Container ID, stable for the window's lifetime within the WM session.
    pub con_id: i64,
    /// X11/Wayland surface ID; only used where a WM command requires it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_id: Option<i64>,
    pub class: String,
    #[serde(default)]
    pub instance: String,
    #[serde(default)]
    pub title: String,
    /// Canonical app name resolved from environment/marks/class.
    pub app_identifier: String,
    /// None means global.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub scope: Scope,
    #[serde(default)]
    pub marks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default)]
    pub floating: bool,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_focused_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<LaunchCorrelation>,
}

impl WindowRecord {
    /// Project mark carried by this record, if any.
    pub fn project_mark(&self) -> Option<ParsedMark> {
        self.marks.iter().find_map(|m| ParsedMark::parse(m))
    }

    /// Mark consistency: every mark that parses as a project mark must
    /// carry this window's own `con_id`.
    pub fn marks_consistent(&self) -> bool {
        self.marks
            .iter()
            .filter_map(|m| ParsedMark::parse(m))
            .all(|m| m.con_id == self.con_id)
    }
}

/// A parsed `<scope>:<app>:<project>:<con_id>` mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMark {
    pub scope: Scope,
    pub app: String,
    pub project: String,
    pub con_id: i64,
}

impl ParsedMark {
    /// Parse a canonical project mark. Returns `None` for context marks,
    /// legacy marks, and arbitrary user marks.
    pub fn parse(mark: &str) -> Option<Self> {
        let mut parts = mark.splitn(4, ':');
        let scope = Scope::parse(parts.next()?)?;
        let app = parts.next()?;
        let project = parts.next()?;
        let con_id: i64 = parts.next()?.parse().ok()?;
        if app.is_empty() || project.is_empty() {
            return None;
        }
        Some(Self {
            scope,
            app: app.to_string(),
            project: project.to_string(),
            con_id,
        })
    }
}

/// Build the canonical project mark for a window.
pub fn build_mark(scope: Scope, app: &str, project: &str, con_id: i64) -> String {
    format!("{}:{}:{}:{}", scope.as_str(), app, project, con_id)
}

/// Build the optional context mark.
pub fn build_context_mark(context_key: &str) -> String {
    format!("ctx:{context_key}")
}

/// Extract the project name from a legacy `project:<name>` mark.
pub fn parse_legacy_mark(mark: &str) -> Option<&str> {
    let name = mark.strip_prefix("project:")?;
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Whether the mark is one of ours (canonical or legacy project mark).
pub fn is_project_mark(mark: &str) -> bool {
    ParsedMark::parse(mark).is_some() || parse_legacy_mark(mark).is_some()
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
