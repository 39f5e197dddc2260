// SPDX-License-Identifier: MIT

//! Project configuration and active-project state.
//!
//! Project files are written by external tooling; the daemon consumes the
//! parsed form. Workspace preferences map workspace numbers to output
//! roles (primary/secondary/tertiary).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One entry in a project's auto-launch list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub command: String,
    /// Focus this workspace before spawning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<i32>,
    /// Delay before the next entry is launched.
    #[serde(default)]
    pub launch_delay_ms: u64,
    /// Best-effort: wait for this mark to appear before continuing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_mark: Option<String>,
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    /// Extra environment for the spawned process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_wait_timeout_ms() -> u64 {
    5_000
}

/// Per-project configuration from `projects/<name>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub icon: String,
    pub directory: PathBuf,
    #[serde(default)]
    pub scoped_classes: Vec<String>,
    #[serde(default)]
    pub auto_launch: Vec<LaunchSpec>,
    /// Workspace number → output role name.
    #[serde(default)]
    pub workspace_preferences: BTreeMap<i32, String>,
}

impl ProjectConfig {
    /// Display name, falling back to the identifier.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// Persisted active-project state (`active-project.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveProject {
    /// None means global mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
