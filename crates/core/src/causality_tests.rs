// SPDX-License-Identifier: MIT

use super::*;
use yare::parameterized;

fn binding(command: &str) -> UserAction {
    UserAction {
        action_id: 1,
        timestamp_ms: 0,
        action_type: ActionType::Binding,
        symbol: Some("Return".to_string()),
        command: command.to_string(),
    }
}

#[parameterized(
    immediate = { 50, 1.0 },
    very_quick = { 80, 0.9 },
    quick = { 200, 0.7 },
    delayed = { 350, 0.5 },
    slow = { 499, 0.3 },
)]
fn temporal_buckets(delta: u64, expected: f64) {
    assert_eq!(temporal_score(delta), expected);
}

#[parameterized(
    binding_window = { ActionType::Binding, "window::new", 0.6 },
    binding_workspace = { ActionType::Binding, "workspace::focus", 0.6 },
    binding_other = { ActionType::Binding, "output::change", 0.3 },
    ipc = { ActionType::IpcCommand, "window::new", 0.7 },
    keypress = { ActionType::Keypress, "window::title", 0.5 },
    mouse_focus = { ActionType::MouseClick, "window::focus", 0.7 },
    mouse_move = { ActionType::MouseClick, "workspace::move", 0.7 },
    mouse_other = { ActionType::MouseClick, "window::new", 0.4 },
)]
fn semantic_pairs(action: ActionType, event_type: &str, expected: f64) {
    assert_eq!(semantic_score(action, event_type), expected);
}

#[parameterized(
    alone = { 0, 1.0 },
    one_other = { 1, 0.7 },
    two_others = { 2, 0.5 },
    crowd = { 5, 0.3 },
)]
fn exclusivity_buckets(competing: usize, expected: f64) {
    assert_eq!(exclusivity_score(competing), expected);
}

#[parameterized(
    primary = { 0, 1.0 },
    secondary = { 1, 0.7 },
    tertiary = { 2, 0.4 },
    deep = { 3, 0.2 },
)]
fn cascade_buckets(depth: u32, expected: f64) {
    assert_eq!(cascade_score(depth), expected);
}

#[test]
fn binding_to_window_new_at_80ms_is_likely() {
    // 0.4*0.9 + 0.3*0.6 + 0.2*1.0 + 0.1*1.0 = 0.84
    let action = binding("exec zed");
    let (score, level, factors, reasoning) =
        calculate_confidence(&action, "window::new", 80, 0, 0);

    assert!((score - 0.84).abs() < 1e-9);
    assert_eq!(level, ConfidenceLevel::Likely);
    assert_eq!(factors.temporal, 0.9);
    assert_eq!(factors.semantic, 0.6);
    assert_eq!(factors.exclusivity, 1.0);
    assert_eq!(factors.cascade, 1.0);
    assert!(reasoning.contains("80ms"));
}

#[parameterized(
    very_likely = { 0.95, ConfidenceLevel::VeryLikely },
    likely = { 0.84, ConfidenceLevel::Likely },
    boundary_likely = { 0.7, ConfidenceLevel::Likely },
    possible = { 0.55, ConfidenceLevel::Possible },
    unlikely = { 0.35, ConfidenceLevel::Unlikely },
    very_unlikely = { 0.1, ConfidenceLevel::VeryUnlikely },
)]
fn level_thresholds(score: f64, expected: ConfidenceLevel) {
    assert_eq!(ConfidenceLevel::from_score(score), expected);
}

#[test]
fn level_labels() {
    assert_eq!(ConfidenceLevel::Likely.as_str(), "likely");
    assert_eq!(
        serde_json::to_value(ConfidenceLevel::VeryLikely).unwrap(),
        "very_likely"
    );
}
