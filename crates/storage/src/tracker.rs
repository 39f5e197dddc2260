// SPDX-License-Identifier: MIT

//! Durable per-window workspace tracking (`window-workspace-map.json`).
//!
//! Records the last known workspace, floating state, and project of every
//! window that has been hidden, so project switches can restore windows
//! where they were. Schema "1.1" adds geometry and a scratchpad-origin
//! flag; "1.0" files load with defaults and are rewritten as "1.1" on the
//! next save.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::files::{self, StorageError};

/// Current on-disk schema version.
pub const SCHEMA_VERSION: &str = "1.1";

/// Workspace number recorded for windows sitting in the scratchpad.
pub const SCRATCHPAD_WORKSPACE: i32 = -1;

/// Default retention for dead entries.
pub const DEFAULT_MAX_AGE_DAYS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One tracked window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedWindow {
    /// `-1` means scratchpad.
    pub workspace_number: i32,
    #[serde(default)]
    pub floating: bool,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub class: String,
    /// Unix seconds.
    pub last_seen: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    /// Window lived in the scratchpad before any project filtering.
    #[serde(default)]
    pub original_scratchpad: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct TrackerDoc {
    version: String,
    #[serde(default)]
    windows: BTreeMap<String, TrackedWindow>,
}

/// Tracker over the persistent window→workspace map.
#[derive(Debug)]
pub struct WorkspaceTracker {
    path: PathBuf,
    entries: HashMap<i64, TrackedWindow>,
}

impl WorkspaceTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load from disk. Unknown versions and corrupt files reinitialize
    /// empty (corrupt files are rotated to `.bak` first).
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let mut tracker = Self::new(path.clone());

        let Some(doc) = files::load_json::<TrackerDoc>(&path)? else {
            return Ok(tracker);
        };

        match doc.version.as_str() {
            "1.0" | "1.1" => {
                for (key, entry) in doc.windows {
                    match key.parse::<i64>() {
                        Ok(con_id) => {
                            tracker.entries.insert(con_id, entry);
                        }
                        Err(_) => warn!(%key, "skipping non-numeric tracker key"),
                    }
                }
                info!(
                    count = tracker.entries.len(),
                    version = %doc.version,
                    "loaded workspace tracker"
                );
            }
            other => {
                warn!(version = other, "unsupported tracker schema, reinitializing");
            }
        }

        Ok(tracker)
    }

    /// Serialize the current map as a schema-1.1 document.
    pub fn to_doc(&self) -> serde_json::Value {
        let windows: BTreeMap<String, TrackedWindow> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.to_string(), entry.clone()))
            .collect();

        // Serialization of this shape cannot fail
        serde_json::to_value(TrackerDoc {
            version: SCHEMA_VERSION.to_string(),
            windows,
        })
        .unwrap_or(serde_json::Value::Null)
    }

    /// Atomic save (always rewrites as schema 1.1).
    pub fn save(&self) -> Result<(), StorageError> {
        files::save_json(&self.path, &self.to_doc())
    }

    /// Record a window's current placement.
    #[allow(clippy::too_many_arguments)]
    pub fn track_window(
        &mut self,
        con_id: i64,
        workspace_number: i32,
        floating: bool,
        project: &str,
        app: &str,
        class: &str,
        now_secs: u64,
    ) {
        let original_scratchpad = match self.entries.get(&con_id) {
            // First sighting in the scratchpad marks the origin
            None => workspace_number == SCRATCHPAD_WORKSPACE,
            Some(existing) => existing.original_scratchpad,
        };

        self.entries.insert(
            con_id,
            TrackedWindow {
                workspace_number,
                floating,
                project: project.to_string(),
                app: app.to_string(),
                class: class.to_string(),
                last_seen: now_secs,
                geometry: self.entries.get(&con_id).and_then(|e| e.geometry),
                original_scratchpad,
            },
        );
    }

    pub fn set_geometry(&mut self, con_id: i64, geometry: Geometry) {
        if let Some(entry) = self.entries.get_mut(&con_id) {
            entry.geometry = Some(geometry);
        }
    }

    pub fn get(&self, con_id: i64) -> Option<&TrackedWindow> {
        self.entries.get(&con_id)
    }

    pub fn remove(&mut self, con_id: i64) -> bool {
        self.entries.remove(&con_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked windows of one project.
    pub fn project_windows(&self, project: &str) -> Vec<(i64, TrackedWindow)> {
        let mut out: Vec<(i64, TrackedWindow)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.project == project)
            .map(|(id, e)| (*id, e.clone()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Drop entries for windows gone from the tree or unseen for
    /// `max_age_days`. Returns the number removed.
    pub fn cleanup_stale_entries(
        &mut self,
        live_con_ids: &HashSet<i64>,
        max_age_days: u64,
        now_secs: u64,
    ) -> usize {
        let max_age_secs = max_age_days * 86_400;
        let before = self.entries.len();

        self.entries.retain(|con_id, entry| {
            live_con_ids.contains(con_id)
                && now_secs.saturating_sub(entry.last_seen) <= max_age_secs
        });

        before - self.entries.len()
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
