// SPDX-License-Identifier: MIT

//! Workspace-mode scenarios: three-digit goto/move with monitor
//! selection.

use crate::prelude::*;
use i3pm_core::ModeType;
use i3pm_engine::{ExecuteResult, ModeNotification};
use i3pm_wm::OutputInfo;

fn headless(name: &str) -> OutputInfo {
    OutputInfo {
        name: name.to_string(),
        active: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn three_digit_move_targets_monitor() {
    let mut s = stack(vec![]);
    s.wm.set_outputs(vec![
        headless("HEADLESS-1"),
        headless("HEADLESS-2"),
        headless("HEADLESS-3"),
    ]);

    {
        let mut mode = s.mode.lock().await;
        mode.enter(ModeType::Move).await.unwrap();
        mode.add_digit('2').await.unwrap();
        mode.add_digit('3').await.unwrap();
        mode.add_digit('1').await.unwrap();

        let result = mode.execute().await.unwrap();
        assert_eq!(
            result,
            ExecuteResult::Workspace {
                workspace: 23,
                output: "HEADLESS-1".to_string(),
                target_monitor: Some("HEADLESS-1".to_string()),
            }
        );
    }

    // Commands in order, then mode exit
    assert_eq!(
        s.wm.commands(),
        vec![
            "workspace number 23".to_string(),
            "move workspace to output HEADLESS-1".to_string(),
            "workspace number 23".to_string(),
            "mode default".to_string(),
        ]
    );

    // The execute notification carries the pending target
    let mut saw = false;
    while let Ok(n) = s.mode_rx.try_recv() {
        if let ModeNotification::WorkspaceMode {
            event_type,
            pending_workspace: Some(pending),
            ..
        } = n
        {
            if event_type == "execute" {
                assert_eq!(pending.workspace_number, 23);
                assert_eq!(pending.target_output, "HEADLESS-1");
                saw = true;
            }
        }
    }
    assert!(saw, "no execute notification with pending workspace");
}

#[tokio::test]
async fn project_mode_commits_through_switcher() {
    let mut s = stack(vec![]);
    s.wm.set_outputs(vec![headless("HEADLESS-1")]);
    s.wm.set_workspaces(vec![workspace(1, "HEADLESS-1")]);
    s.wm.set_tree(tree(1, &[]));
    {
        let mut state = s.state.lock();
        state.projects.insert(
            "nixos".to_string(),
            i3pm_core::ProjectConfig {
                name: "nixos".to_string(),
                display_name: "NixOS".to_string(),
                icon: String::new(),
                directory: "/etc/nixos".into(),
                scoped_classes: vec![],
                auto_launch: vec![],
                workspace_preferences: Default::default(),
            },
        );
    }

    {
        let mut mode = s.mode.lock().await;
        mode.enter(ModeType::Goto).await.unwrap();
        mode.add_char(':').unwrap();
        mode.add_char('n').unwrap();
        let result = mode.execute().await.unwrap();
        assert_eq!(
            result,
            ExecuteResult::Project {
                project: "nixos".to_string()
            }
        );
    }

    assert_eq!(s.state.lock().active_project(), Some("nixos"));

    // Project-mode notifications delivered the scored list along the way
    let mut saw_scored = false;
    while let Ok(n) = s.mode_rx.try_recv() {
        if let ModeNotification::ProjectMode { projects, .. } = n {
            if projects.iter().any(|p| p.name == "nixos" && p.score > 0) {
                saw_scored = true;
            }
        }
    }
    assert!(saw_scored);
}
