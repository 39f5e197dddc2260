// SPDX-License-Identifier: MIT

use super::*;
use yare::parameterized;

fn outputs(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn empty_falls_back() {
    let roles = OutputRoles::from_active_outputs(vec![]);
    assert_eq!(roles.primary, FALLBACK_OUTPUT);
    assert_eq!(roles.tertiary, FALLBACK_OUTPUT);
}

#[test]
fn single_output_serves_all_roles() {
    let roles = OutputRoles::from_active_outputs(outputs(&["eDP-1"]));
    assert_eq!(roles.primary, "eDP-1");
    assert_eq!(roles.secondary, "eDP-1");
    assert_eq!(roles.tertiary, "eDP-1");
}

#[test]
fn two_outputs_share_tertiary() {
    let roles = OutputRoles::from_active_outputs(outputs(&["HDMI-1", "DP-1"]));
    // Sorted by name: DP-1 first
    assert_eq!(roles.primary, "DP-1");
    assert_eq!(roles.secondary, "HDMI-1");
    assert_eq!(roles.tertiary, "HDMI-1");
}

#[test]
fn three_outputs_sorted_by_name() {
    let roles = OutputRoles::from_active_outputs(outputs(&[
        "HEADLESS-3",
        "HEADLESS-1",
        "HEADLESS-2",
    ]));
    assert_eq!(roles.primary, "HEADLESS-1");
    assert_eq!(roles.secondary, "HEADLESS-2");
    assert_eq!(roles.tertiary, "HEADLESS-3");
}

#[parameterized(
    ws1 = { 1, OutputRole::Primary },
    ws2 = { 2, OutputRole::Primary },
    ws3 = { 3, OutputRole::Secondary },
    ws5 = { 5, OutputRole::Secondary },
    ws6 = { 6, OutputRole::Tertiary },
    ws70 = { 70, OutputRole::Tertiary },
)]
fn workspace_distribution(workspace: u32, expected: OutputRole) {
    assert_eq!(role_for_workspace(workspace), expected);
}

#[test]
fn output_for_workspace_uses_roles() {
    let roles = OutputRoles::from_active_outputs(outputs(&["A", "B", "C"]));
    assert_eq!(roles.output_for_workspace(1), "A");
    assert_eq!(roles.output_for_workspace(4), "B");
    assert_eq!(roles.output_for_workspace(9), "C");
}

#[test]
fn role_parsing() {
    assert_eq!(OutputRole::parse("primary"), Some(OutputRole::Primary));
    assert_eq!(OutputRole::parse("quaternary"), None);
}
