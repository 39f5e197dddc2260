// SPDX-License-Identifier: MIT

use super::*;
use serde_json::json;

struct FakeEnvReader;

impl EnvReader for FakeEnvReader {
    fn read(&self, pid: i32) -> I3pmEnv {
        if pid == 1234 {
            i3pm_wm::parse_environ(
                b"I3PM_PROJECT_NAME=nixos\0I3PM_APP_NAME=vscode\0I3PM_SCOPE=scoped\0",
            )
        } else {
            I3pmEnv::default()
        }
    }
}

fn tree() -> serde_json::Value {
    json!({
        "id": 1,
        "type": "root",
        "nodes": [{
            "id": 20,
            "type": "workspace",
            "name": "3",
            "nodes": [
                {"id": 42, "type": "con", "app_id": "code", "pid": 1234, "marks": []},
                {"id": 43, "type": "con", "window": 777, "pid": 9, "marks": ["scoped:firefox:web:43"]},
                {"id": 44, "type": "con", "nodes": []}
            ]
        }]
    })
}

#[test]
fn enrichment_prefers_environment() {
    let enriched = enrich_tree(&tree(), &FakeEnvReader);

    let from_env = &enriched[&42];
    assert_eq!(from_env.project.as_deref(), Some("nixos"));
    assert_eq!(from_env.app_name.as_deref(), Some("vscode"));
    assert_eq!(from_env.scope.as_deref(), Some("scoped"));
}

#[test]
fn enrichment_falls_back_to_marks() {
    let enriched = enrich_tree(&tree(), &FakeEnvReader);

    let from_marks = &enriched[&43];
    assert_eq!(from_marks.project.as_deref(), Some("web"));
    assert_eq!(from_marks.app_name.as_deref(), Some("firefox"));
    assert_eq!(from_marks.marks, vec!["scoped:firefox:web:43"]);
}

#[test]
fn non_windows_are_not_enriched() {
    let enriched = enrich_tree(&tree(), &FakeEnvReader);
    assert!(!enriched.contains_key(&44));
    assert!(!enriched.contains_key(&20));
}

#[test]
fn capture_stamps_root_hash_and_collects_node_hashes() {
    let mut hashes = HashMap::new();
    let snap = capture_snapshot(7, 1_000, tree(), "window::new", &FakeEnvReader, &mut hashes);

    assert_eq!(snap.snapshot_id, 7);
    assert_eq!(snap.event_source, "window::new");
    assert_eq!(snap.root_hash, crate::hasher::tree_hash(&snap.tree_data));
    // Every node got a fingerprint: root, workspace, three cons
    assert_eq!(hashes.len(), 5);
    assert_eq!(hashes[&1].1, snap.root_hash);
}

#[test]
fn identical_trees_capture_identical_root_hashes() {
    let mut h1 = HashMap::new();
    let mut h2 = HashMap::new();
    let a = capture_snapshot(1, 0, tree(), "tick", &FakeEnvReader, &mut h1);
    let b = capture_snapshot(2, 1, tree(), "tick", &FakeEnvReader, &mut h2);
    assert_eq!(a.root_hash, b.root_hash);
}
