// SPDX-License-Identifier: MIT

//! Project-switch scenarios: hide, restore, idempotence, tracker
//! round-trip.

use crate::prelude::*;
use i3pm_core::{Event, Scope, WindowRecord};

fn scoped_window(con_id: i64, project: &str, workspace: &str, class: &str) -> WindowRecord {
    WindowRecord {
        con_id,
        surface_id: None,
        class: class.to_string(),
        instance: String::new(),
        title: String::new(),
        app_identifier: "vscode".to_string(),
        project: Some(project.to_string()),
        scope: Scope::Scoped,
        marks: vec![format!("scoped:vscode:{project}:{con_id}")],
        workspace: Some(workspace.to_string()),
        output: None,
        floating: false,
        created_at_ms: 0,
        last_focused_at_ms: None,
        correlation: None,
    }
}

#[tokio::test]
async fn switch_away_hides_and_switch_back_restores() {
    let mut s = stack(vec![]);
    s.wm.set_workspaces(vec![workspace(1, "eDP-1"), workspace(3, "eDP-1")]);
    s.wm.set_tree(tree(3, &[(42, "Code", &["scoped:vscode:A:42"])]));
    {
        let mut state = s.state.lock();
        state.set_active_project(Some("A".to_string()));
        state.add_window(scoped_window(42, "A", "3", "Code"));
    }

    // Away: window 42 goes to the scratchpad, position recorded
    let outcome = s.switcher.switch(Some("B".to_string())).await.unwrap();
    assert_eq!(outcome.windows_hidden, 1);
    assert_eq!(outcome.windows_restored, 0);
    {
        let tracker = s.tracker.lock();
        let entry = tracker.get(42).unwrap();
        assert_eq!(entry.workspace_number, 3);
        assert!(!entry.floating);
        assert_eq!(entry.project, "A");
    }
    match s.events_rx.recv().await.unwrap().0 {
        Event::ProjectSwitch {
            old,
            new,
            windows_hidden,
            windows_restored,
            ..
        } => {
            assert_eq!(old.as_deref(), Some("A"));
            assert_eq!(new.as_deref(), Some("B"));
            assert_eq!((windows_hidden, windows_restored), (1, 0));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Back: window 42 returns to workspace 3, non-floating
    let outcome = s.switcher.switch(Some("A".to_string())).await.unwrap();
    assert_eq!(outcome.windows_hidden, 0);
    assert_eq!(outcome.windows_restored, 1);
    assert!(s
        .wm
        .commands()
        .iter()
        .any(|c| c == "[con_id=42] scratchpad show, move workspace number 3, floating disable"));
    assert_eq!(s.state.lock().active_project(), Some("A"));
}

#[tokio::test]
async fn switch_to_current_project_is_idempotent() {
    let mut s = stack(vec![]);
    s.wm.set_workspaces(vec![workspace(1, "eDP-1")]);
    {
        let mut state = s.state.lock();
        state.set_active_project(Some("A".to_string()));
        state.add_window(scoped_window(42, "A", "3", "Code"));
    }

    let outcome = s.switcher.switch(Some("A".to_string())).await.unwrap();
    assert!(outcome.no_op);
    assert!(s.wm.commands().is_empty());
    assert!(s.tracker.lock().is_empty());

    // The request is still recorded
    match s.events_rx.recv().await.unwrap().0 {
        Event::ProjectSwitch { old, new, .. } => {
            assert_eq!(old, new);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn restore_falls_back_when_workspace_disappeared() {
    let s = stack(vec![]);
    // Workspace 7 no longer exists; only 1 does
    s.wm.set_workspaces(vec![workspace(1, "eDP-1")]);
    s.wm.set_tree(tree(1, &[]));
    {
        let mut state = s.state.lock();
        state.set_active_project(None);
        state.add_window(scoped_window(42, "A", "7", "Code"));
    }
    {
        let mut tracker = s.tracker.lock();
        tracker.track_window(42, 7, false, "A", "vscode", "Code", 0);
    }

    let outcome = s.switcher.switch(Some("A".to_string())).await.unwrap();
    assert_eq!(outcome.windows_restored, 1);
    assert_eq!(outcome.fallback_warnings.len(), 1);
    assert!(s
        .wm
        .commands()
        .iter()
        .any(|c| c == "[con_id=42] scratchpad show, move workspace number 1, floating disable"));
}

#[tokio::test]
async fn concurrent_requests_serialize_in_order() {
    let mut s = stack(vec![]);
    s.wm.set_workspaces(vec![workspace(1, "eDP-1")]);
    s.wm.set_tree(tree(1, &[]));

    let (a, b, c) = tokio::join!(
        s.switcher.switch(Some("A".to_string())),
        s.switcher.switch(Some("B".to_string())),
        s.switcher.switch(Some("C".to_string())),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    // Transitions chain without interleaving: each switch's old is the
    // previous switch's new
    let mut transitions = Vec::new();
    while let Ok((event, _)) = s.events_rx.try_recv() {
        if let Event::ProjectSwitch { old, new, .. } = event {
            transitions.push((old, new));
        }
    }
    assert_eq!(transitions.len(), 3);
    for pair in transitions.windows(2) {
        assert_eq!(pair[0].1, pair[1].0);
    }
}
