// SPDX-License-Identifier: MIT

//! Snapshot capture and enrichment for the tree-diff daemon.
//!
//! A snapshot is the raw `get_tree` JSON plus per-window context derived
//! from `/proc/<pid>/environ` and mark parsing, stamped with the root
//! Merkle hash.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use i3pm_core::{EnrichedWindow, ParsedMark, TreeSnapshot, VOLATILE_FIELDS};
use i3pm_wm::I3pmEnv;

use crate::hasher;

/// Reads the I3PM environment for a PID; pluggable for tests.
pub trait EnvReader: Send + Sync {
    fn read(&self, pid: i32) -> I3pmEnv;
}

/// `/proc`-backed reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcEnvReader;

impl EnvReader for ProcEnvReader {
    fn read(&self, pid: i32) -> I3pmEnv {
        i3pm_wm::read_i3pm_env(pid)
    }
}

/// Capture a snapshot: hash the tree (populating `hashes` for the cache)
/// and derive per-window enrichment.
pub fn capture_snapshot(
    snapshot_id: u64,
    timestamp_ms: u64,
    tree_data: Value,
    event_source: &str,
    env_reader: &dyn EnvReader,
    hashes: &mut HashMap<i64, (u64, u64)>,
) -> TreeSnapshot {
    let root_hash = hasher::subtree_hash(&tree_data, &VOLATILE_FIELDS, Some(hashes));
    let enriched = enrich_tree(&tree_data, env_reader);

    TreeSnapshot {
        snapshot_id,
        timestamp_ms,
        tree_data,
        enriched,
        root_hash,
        event_source: event_source.to_string(),
    }
}

/// Walk the raw tree and derive context for every window container.
pub fn enrich_tree(tree: &Value, env_reader: &dyn EnvReader) -> BTreeMap<i64, EnrichedWindow> {
    let mut enriched = BTreeMap::new();
    walk(tree, &mut |node| {
        let is_window = node.get("window").map(|w| !w.is_null()).unwrap_or(false)
            || node.get("app_id").map(|a| !a.is_null()).unwrap_or(false);
        if !is_window {
            return;
        }
        let Some(con_id) = hasher::node_id(node) else {
            return;
        };

        let marks: Vec<String> = node
            .get("marks")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut entry = EnrichedWindow {
            marks: marks.clone(),
            ..EnrichedWindow::default()
        };

        // Environment wins; marks fill the gaps
        if let Some(pid) = node.get("pid").and_then(Value::as_i64) {
            let env = env_reader.read(pid as i32);
            entry.app_name = env.app_name().map(String::from);
            entry.project = env.project_name().map(String::from);
            entry.scope = env.scope().map(String::from);
            entry.context_key = env.context_key().map(String::from);
        }

        if entry.project.is_none() {
            if let Some(mark) = marks.iter().find_map(|m| ParsedMark::parse(m)) {
                entry.app_name.get_or_insert(mark.app);
                entry.project = Some(mark.project);
                entry.scope.get_or_insert(mark.scope.as_str().to_string());
            }
        }

        enriched.insert(con_id, entry);
    });
    enriched
}

fn walk(node: &Value, visit: &mut impl FnMut(&Value)) {
    visit(node);
    for key in ["nodes", "floating_nodes"] {
        if let Some(Value::Array(children)) = node.get(key) {
            for child in children {
                walk(child, visit);
            }
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
