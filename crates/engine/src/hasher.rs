// SPDX-License-Identifier: MIT

//! Merkle hashing over raw WM trees.
//!
//! Content hash covers a node's own fields (children and volatile fields
//! excluded) with deterministic key order; the subtree hash combines it
//! with the ordered child hashes (regular children before floating) so
//! any descendant change propagates to the root.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use serde_json::Value;

use i3pm_core::VOLATILE_FIELDS;

/// Keys never hashed: child lists plus the configured volatile set.
fn is_excluded(key: &str, exclude: &[&str]) -> bool {
    key == "nodes" || key == "floating_nodes" || exclude.contains(&key)
}

/// Hash of a node's own fields with deterministic key order.
pub fn content_hash(node: &Value, exclude: &[&str]) -> u64 {
    let mut filtered = BTreeMap::new();
    if let Value::Object(map) = node {
        for (key, value) in map {
            if !is_excluded(key, exclude) {
                filtered.insert(key.as_str(), value);
            }
        }
    }

    // BTreeMap iteration is key-sorted, so the serialized form is stable
    let serialized = serde_json::to_string(&filtered).unwrap_or_default();

    let mut hasher = DefaultHasher::new();
    serialized.hash(&mut hasher);
    hasher.finish()
}

/// Merkle hash of a node and all descendants.
///
/// When `out` is given, every visited node's `(content, subtree)` pair is
/// recorded by node ID for cache population.
pub fn subtree_hash(
    node: &Value,
    exclude: &[&str],
    mut out: Option<&mut HashMap<i64, (u64, u64)>>,
) -> u64 {
    subtree_hash_inner(node, exclude, &mut out)
}

fn subtree_hash_inner(
    node: &Value,
    exclude: &[&str],
    out: &mut Option<&mut HashMap<i64, (u64, u64)>>,
) -> u64 {
    let content = content_hash(node, exclude);

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);

    for key in ["nodes", "floating_nodes"] {
        if let Some(Value::Array(children)) = node.get(key) {
            for child in children {
                subtree_hash_inner(child, exclude, out).hash(&mut hasher);
            }
        }
    }

    let subtree = hasher.finish();

    if let Some(map) = out {
        if let Some(id) = node_id(node) {
            map.insert(id, (content, subtree));
        }
    }

    subtree
}

/// Root hash of a full tree.
pub fn tree_hash(tree: &Value) -> u64 {
    subtree_hash(tree, &VOLATILE_FIELDS, None)
}

/// Node identity within the tree.
pub fn node_id(node: &Value) -> Option<i64> {
    node.get("id").and_then(Value::as_i64)
}

/// Human-readable node location for change records.
pub fn node_path(node: &Value) -> String {
    let node_type = node
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    match node_type {
        "workspace" => {
            let name = node.get("name").and_then(Value::as_str).unwrap_or("unnamed");
            format!("workspace[{name}]")
        }
        "output" => {
            let name = node.get("name").and_then(Value::as_str).unwrap_or("unknown");
            format!("output[{name}]")
        }
        "con" | "floating_con" if node.get("window").is_some() || node.get("app_id").is_some() => {
            match node.get("window").and_then(Value::as_i64) {
                Some(window) => format!("window[{window}]"),
                None => format!("window[{}]", node_id(node).unwrap_or_default()),
            }
        }
        other => format!("{other}[{}]", node_id(node).unwrap_or_default()),
    }
}

#[cfg(test)]
#[path = "hasher_tests.rs"]
mod tests;
