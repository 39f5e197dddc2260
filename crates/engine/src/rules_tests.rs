// SPDX-License-Identifier: MIT

use super::*;
use i3pm_core::{LayoutMode, MatchCriteria, Scope};
use i3pm_wm::{MockWm, OutputInfo, WorkspaceInfo};

fn window(con_id: i64, class: &str) -> WindowRecord {
    WindowRecord {
        con_id,
        surface_id: Some(0x1400001),
        class: class.to_string(),
        instance: String::new(),
        title: String::new(),
        app_identifier: class.to_string(),
        project: None,
        scope: Scope::Global,
        marks: vec![],
        workspace: Some("1".to_string()),
        output: None,
        floating: false,
        created_at_ms: 0,
        last_focused_at_ms: None,
        correlation: None,
    }
}

fn wm_with_workspace(num: i32) -> MockWm {
    let wm = MockWm::new();
    wm.set_workspaces(vec![WorkspaceInfo {
        name: num.to_string(),
        num,
        output: "eDP-1".to_string(),
        ..Default::default()
    }]);
    wm.set_outputs(vec![OutputInfo {
        name: "eDP-1".to_string(),
        active: true,
        ..Default::default()
    }]);
    wm
}

fn rule(class: &str, actions: Vec<RuleAction>) -> WindowRule {
    WindowRule {
        criteria: MatchCriteria {
            class: Some(class.to_string()),
            ..Default::default()
        },
        actions,
        priority: 0,
    }
}

#[tokio::test]
async fn matching_rule_executes_actions_in_order() {
    let wm = wm_with_workspace(9);
    let engine = RuleEngine::new(vec![rule(
        "mpv",
        vec![
            RuleAction::Workspace {
                target: 9,
                follow: false,
            },
            RuleAction::Float { enable: true },
        ],
    )]);

    let outcomes = engine.apply(&wm, &window(42, "mpv")).await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.success));
    assert_eq!(outcomes[0].action, "workspace");
    assert_eq!(outcomes[1].action, "float");

    let commands = wm.commands();
    assert_eq!(
        commands,
        vec![
            "[con_id=42] move container to workspace number 9".to_string(),
            "[con_id=42] floating enable".to_string(),
        ]
    );
}

#[tokio::test]
async fn non_matching_rule_is_skipped() {
    let wm = wm_with_workspace(9);
    let engine = RuleEngine::new(vec![rule("mpv", vec![RuleAction::Float { enable: true }])]);

    let outcomes = engine.apply(&wm, &window(42, "firefox")).await;
    assert!(outcomes.is_empty());
    assert!(wm.commands().is_empty());
}

#[tokio::test]
async fn nonexistent_workspace_is_valid_target() {
    // Workspace 9 does not exist yet: the WM creates it on the current
    // output, so the move proceeds
    let wm = wm_with_workspace(1);
    let engine = RuleEngine::new(vec![rule(
        "mpv",
        vec![RuleAction::Workspace {
            target: 9,
            follow: false,
        }],
    )]);

    let outcomes = engine.apply(&wm, &window(42, "mpv")).await;
    assert!(outcomes[0].success);
    assert_eq!(
        wm.commands(),
        vec!["[con_id=42] move container to workspace number 9".to_string()]
    );
}

#[tokio::test]
async fn workspace_on_inactive_output_declines_gracefully() {
    let wm = MockWm::new();
    wm.set_workspaces(vec![WorkspaceInfo {
        name: "9".to_string(),
        num: 9,
        output: "HDMI-1".to_string(),
        ..Default::default()
    }]);
    wm.set_outputs(vec![
        OutputInfo {
            name: "eDP-1".to_string(),
            active: true,
            ..Default::default()
        },
        OutputInfo {
            name: "HDMI-1".to_string(),
            active: false,
            ..Default::default()
        },
    ]);
    let engine = RuleEngine::new(vec![rule(
        "mpv",
        vec![
            RuleAction::Workspace {
                target: 9,
                follow: false,
            },
            RuleAction::Float { enable: true },
        ],
    )]);

    let outcomes = engine.apply(&wm, &window(42, "mpv")).await;
    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.as_ref().unwrap().contains("HDMI-1"));
    // Window stays where it is: no move command issued
    assert_eq!(wm.commands(), vec!["[con_id=42] floating enable".to_string()]);
    // Failure does not abort the following action
    assert!(outcomes[1].success);
}

#[tokio::test]
async fn no_active_outputs_declines_workspace_move() {
    let wm = MockWm::new();
    let engine = RuleEngine::new(vec![rule(
        "mpv",
        vec![RuleAction::Workspace {
            target: 2,
            follow: false,
        }],
    )]);

    let outcomes = engine.apply(&wm, &window(42, "mpv")).await;
    assert!(!outcomes[0].success);
    assert!(outcomes[0]
        .error
        .as_ref()
        .unwrap()
        .contains("no active outputs"));
    assert!(wm.commands().is_empty());
}

#[tokio::test]
async fn failed_action_reports_error_and_continues() {
    let wm = wm_with_workspace(9);
    wm.fail_commands_matching("floating");
    let engine = RuleEngine::new(vec![rule(
        "mpv",
        vec![
            RuleAction::Float { enable: true },
            RuleAction::Layout {
                mode: LayoutMode::Tabbed,
            },
        ],
    )]);

    let outcomes = engine.apply(&wm, &window(42, "mpv")).await;
    assert!(!outcomes[0].success);
    assert_eq!(outcomes[0].error.as_deref(), Some("mock failure"));
    assert!(outcomes[1].success);
    assert_eq!(wm.commands().len(), 2);
}

#[tokio::test]
async fn mark_action_addresses_surface_id() {
    let wm = wm_with_workspace(1);
    let engine = RuleEngine::new(vec![rule("mpv", vec![RuleAction::Mark {
        value: "video".to_string(),
    }])]);

    engine.apply(&wm, &window(42, "mpv")).await;
    assert_eq!(
        wm.commands(),
        vec![format!("[id={}] mark --add \"video\"", 0x1400001)]
    );
}

#[tokio::test]
async fn workspace_follow_appends_focus_command() {
    let wm = wm_with_workspace(9);
    let engine = RuleEngine::new(vec![rule("mpv", vec![RuleAction::Workspace {
        target: 9,
        follow: true,
    }])]);

    engine.apply(&wm, &window(42, "mpv")).await;
    assert_eq!(
        wm.commands(),
        vec!["[con_id=42] move container to workspace number 9; workspace number 9".to_string()]
    );
}

#[tokio::test]
async fn hot_swap_replaces_rules() {
    let wm = wm_with_workspace(1);
    let engine = RuleEngine::default();
    assert!(engine.is_empty());

    engine.swap(vec![rule("mpv", vec![RuleAction::Float { enable: false }])]);
    assert_eq!(engine.len(), 1);

    let outcomes = engine.apply(&wm, &window(1, "mpv")).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(wm.commands(), vec!["[con_id=1] floating disable".to_string()]);
}
