// SPDX-License-Identifier: MIT

//! Hash-pruned incremental tree differ.
//!
//! Fast path: identical root hashes mean an empty diff in O(1). Otherwise
//! children are paired by node ID; a paired subtree whose cached hash
//! matches the freshly computed one is skipped wholesale.

use std::time::Instant;

use serde_json::Value;

use i3pm_core::{
    field_significance, ChangeType, FieldChange, NodeChange, TreeDiff, TreeSnapshot,
    VOLATILE_FIELDS,
};

use crate::hash_cache::HashCache;
use crate::hasher;

/// Compute the diff between two consecutive snapshots.
pub fn compute_diff(
    before: &TreeSnapshot,
    after: &TreeSnapshot,
    cache: &mut HashCache,
    diff_id: u64,
) -> TreeDiff {
    let started = Instant::now();

    let mut node_changes = Vec::new();
    if before.root_hash != after.root_hash {
        diff_subtree(
            &before.tree_data,
            &after.tree_data,
            cache,
            &mut node_changes,
        );
    }

    TreeDiff {
        diff_id,
        before_snapshot_id: before.snapshot_id,
        after_snapshot_id: after.snapshot_id,
        node_changes,
        computation_time_ms: started.elapsed().as_secs_f64() * 1000.0,
    }
}

fn diff_subtree(
    old_node: &Value,
    new_node: &Value,
    cache: &mut HashCache,
    out: &mut Vec<NodeChange>,
) {
    // Merkle pruning: unchanged subtree, nothing to visit
    if let Some(node_id) = hasher::node_id(old_node) {
        let fresh = hasher::subtree_hash(new_node, &VOLATILE_FIELDS, None);
        if cache.get_subtree_hash(node_id) == Some(fresh) {
            return;
        }
    }

    let field_changes = compare_fields(old_node, new_node);
    if !field_changes.is_empty() {
        out.push(NodeChange {
            node_id: hasher::node_id(new_node).unwrap_or_default(),
            node_type: new_node
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            change_type: ChangeType::Modified,
            field_changes,
            node_path: hasher::node_path(new_node),
        });
    }

    for key in ["nodes", "floating_nodes"] {
        let empty = Vec::new();
        let old_children = old_node
            .get(key)
            .and_then(Value::as_array)
            .unwrap_or(&empty);
        let new_children = new_node
            .get(key)
            .and_then(Value::as_array)
            .unwrap_or(&empty);
        diff_children(old_children, new_children, cache, out);
    }
}

fn diff_children(
    old_children: &[Value],
    new_children: &[Value],
    cache: &mut HashCache,
    out: &mut Vec<NodeChange>,
) {
    let old_ids: Vec<Option<i64>> = old_children.iter().map(hasher::node_id).collect();
    let new_ids: Vec<Option<i64>> = new_children.iter().map(hasher::node_id).collect();

    for (old_child, old_id) in old_children.iter().zip(&old_ids) {
        let Some(old_id) = old_id else { continue };
        if !new_ids.contains(&Some(*old_id)) {
            out.push(NodeChange {
                node_id: *old_id,
                node_type: old_child
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                change_type: ChangeType::Removed,
                field_changes: vec![],
                node_path: hasher::node_path(old_child),
            });
        }
    }

    for (new_child, new_id) in new_children.iter().zip(&new_ids) {
        let Some(new_id) = new_id else { continue };
        match old_children
            .iter()
            .zip(&old_ids)
            .find(|(_, id)| **id == Some(*new_id))
        {
            Some((old_child, _)) => diff_subtree(old_child, new_child, cache, out),
            None => out.push(NodeChange {
                node_id: *new_id,
                node_type: new_child
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                change_type: ChangeType::Added,
                field_changes: vec![],
                node_path: hasher::node_path(new_child),
            }),
        }
    }
}

fn compare_fields(old_node: &Value, new_node: &Value) -> Vec<FieldChange> {
    let (Value::Object(old_map), Value::Object(new_map)) = (old_node, new_node) else {
        return vec![];
    };

    let mut changes = Vec::new();
    let mut keys: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        if key == "nodes" || key == "floating_nodes" || VOLATILE_FIELDS.contains(&key.as_str()) {
            continue;
        }

        let old_value = old_map.get(key);
        let new_value = new_map.get(key);
        if old_value == new_value {
            continue;
        }

        let change_type = match (old_value, new_value) {
            (None, Some(_)) => ChangeType::Added,
            (Some(_), None) => ChangeType::Removed,
            _ => ChangeType::Modified,
        };

        let old_value = old_value.cloned().unwrap_or(Value::Null);
        let new_value = new_value.cloned().unwrap_or(Value::Null);
        let significance = field_significance(key, &old_value, &new_value);

        changes.push(FieldChange {
            field_path: key.clone(),
            old_value,
            new_value,
            change_type,
            significance,
        });
    }

    changes
}

#[cfg(test)]
#[path = "differ_tests.rs"]
mod tests;
