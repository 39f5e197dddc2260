// SPDX-License-Identifier: MIT

use super::*;
use serde_json::json;

fn tree() -> Node {
    serde_json::from_value(json!({
        "id": 1,
        "type": "root",
        "nodes": [
            {
                "id": 10,
                "type": "output",
                "name": "eDP-1",
                "nodes": [
                    {
                        "id": 20,
                        "type": "workspace",
                        "name": "3",
                        "num": 3,
                        "output": "eDP-1",
                        "nodes": [
                            {
                                "id": 42,
                                "type": "con",
                                "name": "Mozilla Firefox",
                                "app_id": "firefox",
                                "pid": 1234,
                                "marks": ["scoped:firefox:web:42"]
                            },
                            {
                                "id": 43,
                                "type": "con",
                                "name": "editor",
                                "window": 94371840,
                                "window_properties": {"class": "Code", "instance": "code"}
                            }
                        ],
                        "floating_nodes": [
                            {
                                "id": 44,
                                "type": "floating_con",
                                "name": "mpv",
                                "window": 94371841,
                                "window_properties": {"class": "mpv"},
                                "floating": "user_on"
                            }
                        ]
                    }
                ]
            }
        ]
    }))
    .unwrap()
}

#[test]
fn class_prefers_app_id() {
    let tree = tree();
    let firefox = tree.find(42).unwrap();
    assert_eq!(firefox.window_class(), "firefox");

    let code = tree.find(43).unwrap();
    assert_eq!(code.window_class(), "Code");
    assert_eq!(code.window_instance(), "code");
}

#[test]
fn class_unknown_when_nothing_set() {
    let bare = Node {
        id: 1,
        ..Default::default()
    };
    assert_eq!(bare.window_class(), "unknown");
}

#[test]
fn is_window_covers_both_backends() {
    let tree = tree();
    assert!(tree.find(42).unwrap().is_window()); // wayland
    assert!(tree.find(43).unwrap().is_window()); // x11
    assert!(!tree.find(20).unwrap().is_window()); // workspace
}

#[test]
fn walk_visits_floating_nodes() {
    let tree = tree();
    let mut ids = Vec::new();
    tree.walk(&mut |n| ids.push(n.id));
    assert!(ids.contains(&44));
    assert_eq!(tree.window_ids(), vec![42, 43, 44]);
}

#[test]
fn windows_carry_their_workspace() {
    let tree = tree();
    let pairs = tree.windows_with_workspaces();
    assert_eq!(pairs.len(), 3);
    for (window, workspace) in &pairs {
        assert!(window.is_window());
        assert_eq!(workspace.map(|w| w.id), Some(20));
    }
}

#[test]
fn floating_detection() {
    let tree = tree();
    assert!(tree.find(44).unwrap().is_floating());
    assert!(!tree.find(43).unwrap().is_floating());
}

#[test]
fn command_outcome_parses_error_form() {
    let outcomes: Vec<CommandOutcome> = serde_json::from_value(json!([
        {"success": true},
        {"success": false, "error": "No matching node"}
    ]))
    .unwrap();
    assert!(outcomes[0].success);
    assert_eq!(outcomes[1].error.as_deref(), Some("No matching node"));
}
