// SPDX-License-Identifier: MIT

use super::*;
use crate::router::{ConfigPaths, Router};
use i3pm_core::{FakeClock, ProjectConfig, Scope, WindowRecord};
use i3pm_engine::{IdentityResolver, ProcEnvReader, RuleEngine, SwitcherDeps};
use i3pm_storage::WorkspaceTracker;
use i3pm_wm::{MockWm, NoPidProbe};
use tokio::sync::mpsc;

fn client(broadcaster: &Broadcaster) -> ClientHandle {
    let (tx, _rx) = mpsc::unbounded_channel();
    broadcaster.register(tx)
}

struct Harness {
    service: ProjectService,
    client: ClientHandle,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new(1_000_000);
    let wm = MockWm::new();

    let state = Arc::new(Mutex::new(StateStore::new()));
    let tracker = Arc::new(Mutex::new(WorkspaceTracker::new(
        dir.path().join("map.json"),
    )));
    let ring = Arc::new(Mutex::new(EventRing::new(500)));
    let registry = Arc::new(Mutex::new(LaunchRegistry::new(Arc::new(clock.clone()))));
    let broadcaster = Broadcaster::new();

    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let (switcher, _handle) = i3pm_engine::ProjectSwitcher::spawn(SwitcherDeps {
        wm: Arc::new(wm.clone()),
        state: Arc::clone(&state),
        tracker: Arc::clone(&tracker),
        clock: Arc::new(clock.clone()),
        launcher: Arc::new(i3pm_engine::ProcessLauncher),
        active_project_path: dir.path().join("active-project.json"),
        events_tx,
    });

    let (mode_tx, _mode_rx) = mpsc::unbounded_channel();
    let mode = Arc::new(tokio::sync::Mutex::new(ModeManager::new(
        Arc::new(wm.clone()),
        switcher.clone(),
        Arc::clone(&state),
        Arc::new(clock.clone()),
        mode_tx,
    )));

    let router = Arc::new(Router::new(
        Arc::new(wm.clone()),
        Arc::clone(&state),
        tracker,
        Arc::clone(&ring),
        broadcaster.clone(),
        RuleEngine::default(),
        IdentityResolver::new(Arc::new(ProcEnvReader), Arc::new(NoPidProbe)),
        Arc::clone(&registry),
        Arc::clone(&mode),
        Arc::new(clock.clone()),
        ConfigPaths {
            app_classes: dir.path().join("app-classes.json"),
            window_rules: dir.path().join("window-rules.json"),
            focus_state: dir.path().join("focus.json"),
        },
    ));

    let service = ProjectService {
        state,
        ring,
        switcher,
        registry,
        mode,
        router,
        broadcaster: broadcaster.clone(),
        health: Arc::new(|| None),
        start_time: Instant::now(),
    };

    Harness {
        client: client(&broadcaster),
        service,
        _dir: dir,
    }
}

fn window(con_id: i64, project: Option<&str>) -> WindowRecord {
    WindowRecord {
        con_id,
        surface_id: None,
        class: "Code".to_string(),
        instance: String::new(),
        title: String::new(),
        app_identifier: "vscode".to_string(),
        project: project.map(String::from),
        scope: Scope::Scoped,
        marks: vec![],
        workspace: None,
        output: None,
        floating: false,
        created_at_ms: 0,
        last_focused_at_ms: None,
        correlation: None,
    }
}

#[tokio::test]
async fn get_status_shape() {
    let h = harness();
    {
        let mut state = h.service.state.lock();
        state.connected = true;
        state.set_active_project(Some("nixos".to_string()));
        state.add_window(window(1, Some("nixos")));
    }

    let result = h
        .service
        .handle("get_status", None, &h.client)
        .await
        .unwrap();
    assert_eq!(result["status"], "running");
    assert_eq!(result["connected"], true);
    assert_eq!(result["active_project"], "nixos");
    assert_eq!(result["window_count"], 1);
    assert_eq!(result["error_count"], 0);
}

#[tokio::test]
async fn get_active_project_global_mode() {
    let h = harness();
    let result = h
        .service
        .handle("get_active_project", None, &h.client)
        .await
        .unwrap();
    assert_eq!(result["project_name"], serde_json::Value::Null);
    assert_eq!(result["is_global"], true);
}

#[tokio::test]
async fn get_projects_includes_window_counts() {
    let h = harness();
    {
        let mut state = h.service.state.lock();
        state.projects.insert(
            "nixos".to_string(),
            ProjectConfig {
                name: "nixos".to_string(),
                display_name: "NixOS".to_string(),
                icon: "".to_string(),
                directory: "/etc/nixos".into(),
                scoped_classes: vec![],
                auto_launch: vec![],
                workspace_preferences: Default::default(),
            },
        );
        state.add_window(window(1, Some("nixos")));
        state.add_window(window(2, Some("nixos")));
    }

    let result = h
        .service
        .handle("get_projects", None, &h.client)
        .await
        .unwrap();
    let projects = result["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["name"], "nixos");
    assert_eq!(projects[0]["window_count"], 2);
}

#[tokio::test]
async fn get_windows_filters_by_project() {
    let h = harness();
    {
        let mut state = h.service.state.lock();
        state.add_window(window(1, Some("a")));
        state.add_window(window(2, Some("b")));
    }

    let all = h
        .service
        .handle("get_windows", None, &h.client)
        .await
        .unwrap();
    assert_eq!(all["windows"].as_array().unwrap().len(), 2);

    let filtered = h
        .service
        .handle(
            "get_windows",
            Some(&serde_json::json!({"project": "a"})),
            &h.client,
        )
        .await
        .unwrap();
    let windows = filtered["windows"].as_array().unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0]["con_id"], 1);
}

#[tokio::test]
async fn switch_project_returns_outcome() {
    let h = harness();
    let result = h
        .service
        .handle(
            "switch_project",
            Some(&serde_json::json!({"project": "B"})),
            &h.client,
        )
        .await
        .unwrap();
    assert_eq!(result["new"], "B");
    assert_eq!(h.service.state.lock().active_project(), Some("B"));
}

#[tokio::test]
async fn get_events_respects_filters() {
    let h = harness();
    h.service.router.record_event(
        i3pm_core::Event::Tick {
            payload: "a".to_string(),
        },
        i3pm_core::Source::Wm,
    );
    h.service.router.record_event(
        i3pm_core::Event::WindowFocus {
            con_id: 1,
            workspace: None,
        },
        i3pm_core::Source::Wm,
    );

    let result = h
        .service
        .handle(
            "get_events",
            Some(&serde_json::json!({"event_type": "window"})),
            &h.client,
        )
        .await
        .unwrap();
    let events = result["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "window::focus");
}

#[tokio::test]
async fn launch_notification_registers_and_reports_stats() {
    let h = harness();
    let result = h
        .service
        .handle(
            "launch_notification",
            Some(&serde_json::json!({
                "app_name": "zed",
                "project_name": "P",
                "expected_class": "Zed",
                "workspace_number": 5
            })),
            &h.client,
        )
        .await
        .unwrap();
    assert!(result["launch_id"].as_str().unwrap().starts_with("zed-"));

    let stats = h
        .service
        .handle("get_launch_stats", None, &h.client)
        .await
        .unwrap();
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["total_notifications"], 1);
}

#[tokio::test]
async fn launch_notification_requires_fields() {
    let h = harness();
    let err = h
        .service
        .handle(
            "launch_notification",
            Some(&serde_json::json!({"app_name": "zed"})),
            &h.client,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, crate::protocol::INVALID_PARAMS);
}

#[tokio::test]
async fn subscribe_and_list_monitors() {
    let h = harness();
    let result = h
        .service
        .handle(
            "subscribe_events",
            Some(&serde_json::json!({"enable": true})),
            &h.client,
        )
        .await
        .unwrap();
    assert_eq!(result["subscribed"], true);

    let monitors = h
        .service
        .handle("list_monitors", None, &h.client)
        .await
        .unwrap();
    let clients = monitors["clients"].as_array().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["subscribed"], true);
}

#[tokio::test]
async fn unknown_method_errors() {
    let h = harness();
    let err = h
        .service
        .handle("frobnicate", None, &h.client)
        .await
        .unwrap_err();
    assert_eq!(err.code, crate::protocol::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn mode_command_drives_the_fsm() {
    let h = harness();
    let result = h
        .service
        .handle(
            "mode_command",
            Some(&serde_json::json!({"command": "enter", "value": "goto"})),
            &h.client,
        )
        .await
        .unwrap();
    assert_eq!(result["state"]["active"], true);

    let result = h
        .service
        .handle(
            "mode_command",
            Some(&serde_json::json!({"command": "digit", "value": "7"})),
            &h.client,
        )
        .await
        .unwrap();
    assert_eq!(result["result"], "7");

    let state = h
        .service
        .handle("get_mode_state", None, &h.client)
        .await
        .unwrap();
    assert_eq!(state["state"]["accumulated_digits"], "7");
}
