// SPDX-License-Identifier: MIT

//! Tree-diff data model: snapshots, fingerprints, field/node changes.
//!
//! The diff algorithm lives in the engine; these types are the shared
//! vocabulary between the differ, the hash cache, and the event ring.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fields excluded from hashing and comparison (volatile, not meaningful).
pub const VOLATILE_FIELDS: [&str; 3] = ["last_split_layout", "focus", "percent"];

/// Per-window context derived outside the WM tree (environ, marks).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_key: Option<String>,
    #[serde(default)]
    pub marks: Vec<String>,
}

/// Immutable capture of the WM tree at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub snapshot_id: u64,
    pub timestamp_ms: u64,
    /// Full tree as returned by `get_tree`.
    pub tree_data: serde_json::Value,
    /// con_id → derived context.
    #[serde(default)]
    pub enriched: BTreeMap<i64, EnrichedWindow>,
    pub root_hash: u64,
    /// WM event that triggered the capture.
    pub event_source: String,
}

/// Cached hashes for one tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFingerprint {
    pub node_id: i64,
    /// Hash of the node's own fields, children excluded.
    pub content_hash: u64,
    /// Merkle hash covering the node and all descendants.
    pub subtree_hash: u64,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

/// One changed field on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field_path: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub change_type: ChangeType,
    pub significance: f64,
}

/// One changed node with its field-level detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeChange {
    pub node_id: i64,
    pub node_type: String,
    pub change_type: ChangeType,
    pub field_changes: Vec<FieldChange>,
    /// Human-readable location, e.g. `workspace[3]` or `window[94371840]`.
    pub node_path: String,
}

impl NodeChange {
    /// Node significance is the maximum field significance; bare
    /// additions/removals count as 1.0.
    pub fn significance(&self) -> f64 {
        if self.field_changes.is_empty() {
            return match self.change_type {
                ChangeType::Added | ChangeType::Removed => 1.0,
                ChangeType::Modified => 0.0,
            };
        }
        self.field_changes
            .iter()
            .map(|f| f.significance)
            .fold(0.0, f64::max)
    }
}

/// A structural diff between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDiff {
    pub diff_id: u64,
    pub before_snapshot_id: u64,
    pub after_snapshot_id: u64,
    pub node_changes: Vec<NodeChange>,
    pub computation_time_ms: f64,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.node_changes.is_empty()
    }

    /// Diff significance is the maximum node significance.
    pub fn significance(&self) -> f64 {
        self.node_changes
            .iter()
            .map(NodeChange::significance)
            .fold(0.0, f64::max)
    }
}

/// Significance of one field change.
///
/// Focus/urgency/window/name changes always matter; floating, fullscreen,
/// visibility and layout are medium; sub-threshold geometry jitter is
/// noise.
pub fn field_significance(
    field_path: &str,
    old_value: &serde_json::Value,
    new_value: &serde_json::Value,
) -> f64 {
    let field_name = field_path.rsplit('.').next().unwrap_or(field_path);

    match field_name {
        "focused" | "urgent" | "window" | "name" => 1.0,
        "floating" | "fullscreen" | "visible" | "layout" => 0.5,
        "x" | "y" | "width" | "height" => {
            match (old_value.as_f64(), new_value.as_f64()) {
                (Some(old), Some(new)) if (new - old).abs() < 5.0 => 0.1,
                _ => 0.5,
            }
        }
        _ => 0.2,
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
