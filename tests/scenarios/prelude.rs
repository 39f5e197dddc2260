// SPDX-License-Identifier: MIT

//! Shared wiring for scenario tests: a full project-daemon stack over a
//! mock WM.

use std::sync::Arc;

use parking_lot::Mutex;

pub use i3pm_core::Clock;
use i3pm_core::{EventRing, FakeClock};
use i3pm_daemon::listener::Broadcaster;
use i3pm_daemon::router::{ConfigPaths, Router};
use i3pm_engine::snapshot::EnvReader;
use i3pm_engine::{
    IdentityResolver, LaunchRegistry, ModeManager, ProjectSwitcher, RuleEngine, SwitcherDeps,
};
use i3pm_storage::{StateStore, WorkspaceTracker};
use i3pm_wm::{I3pmEnv, MockWm, NoPidProbe};

/// Env reader with a fixed table keyed by PID.
pub struct TableEnvReader;

impl EnvReader for TableEnvReader {
    fn read(&self, pid: i32) -> I3pmEnv {
        match pid {
            100 => i3pm_wm::parse_environ(
                b"I3PM_PROJECT_NAME=A\0I3PM_APP_NAME=firefox\0I3PM_SCOPE=scoped\0",
            ),
            200 => i3pm_wm::parse_environ(
                b"I3PM_PROJECT_NAME=A\0I3PM_APP_NAME=vscode\0I3PM_SCOPE=scoped\0",
            ),
            _ => I3pmEnv::default(),
        }
    }
}

pub struct Stack {
    pub wm: MockWm,
    pub state: Arc<Mutex<StateStore>>,
    pub tracker: Arc<Mutex<WorkspaceTracker>>,
    pub ring: Arc<Mutex<EventRing>>,
    pub registry: Arc<Mutex<LaunchRegistry>>,
    pub switcher: ProjectSwitcher,
    pub router: Router,
    pub mode: Arc<tokio::sync::Mutex<ModeManager>>,
    pub events_rx: tokio::sync::mpsc::UnboundedReceiver<(i3pm_core::Event, i3pm_core::Source)>,
    pub mode_rx: tokio::sync::mpsc::UnboundedReceiver<i3pm_engine::ModeNotification>,
    pub clock: FakeClock,
    pub _dir: tempfile::TempDir,
}

/// Build the full stack with the given rules.
pub fn stack(rules: Vec<i3pm_core::WindowRule>) -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new(1_000_000);
    let wm = MockWm::new();

    let state = Arc::new(Mutex::new(StateStore::new()));
    let tracker = Arc::new(Mutex::new(WorkspaceTracker::new(
        dir.path().join("window-workspace-map.json"),
    )));
    let ring = Arc::new(Mutex::new(EventRing::default()));
    let registry = Arc::new(Mutex::new(LaunchRegistry::new(Arc::new(clock.clone()))));
    let broadcaster = Broadcaster::new();

    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let (switcher, _worker) = ProjectSwitcher::spawn(SwitcherDeps {
        wm: Arc::new(wm.clone()),
        state: Arc::clone(&state),
        tracker: Arc::clone(&tracker),
        clock: Arc::new(clock.clone()),
        launcher: Arc::new(i3pm_engine::ProcessLauncher),
        active_project_path: dir.path().join("active-project.json"),
        events_tx,
    });

    let (mode_tx, mode_rx) = tokio::sync::mpsc::unbounded_channel();
    let mode = Arc::new(tokio::sync::Mutex::new(ModeManager::new(
        Arc::new(wm.clone()),
        switcher.clone(),
        Arc::clone(&state),
        Arc::new(clock.clone()),
        mode_tx,
    )));

    let router = Router::new(
        Arc::new(wm.clone()),
        Arc::clone(&state),
        Arc::clone(&tracker),
        Arc::clone(&ring),
        broadcaster,
        RuleEngine::new(rules),
        IdentityResolver::new(Arc::new(TableEnvReader), Arc::new(NoPidProbe)),
        Arc::clone(&registry),
        Arc::clone(&mode),
        Arc::new(clock.clone()),
        ConfigPaths {
            app_classes: dir.path().join("app-classes.json"),
            window_rules: dir.path().join("window-rules.json"),
            focus_state: dir.path().join("focus-state.json"),
        },
    );

    Stack {
        wm,
        state,
        tracker,
        ring,
        registry,
        switcher,
        router,
        mode,
        events_rx,
        mode_rx,
        clock,
        _dir: dir,
    }
}

/// A workspace reply entry.
pub fn workspace(num: i32, output: &str) -> i3pm_wm::WorkspaceInfo {
    i3pm_wm::WorkspaceInfo {
        name: num.to_string(),
        num,
        output: output.to_string(),
        ..Default::default()
    }
}

/// A tree holding the given `(con_id, class, marks)` windows on one
/// workspace.
pub fn tree(workspace_num: i32, windows: &[(i64, &str, &[&str])]) -> i3pm_wm::Node {
    let nodes: Vec<serde_json::Value> = windows
        .iter()
        .map(|(id, class, marks)| {
            serde_json::json!({
                "id": id,
                "type": "con",
                "name": format!("{class} window"),
                "app_id": class,
                "marks": marks,
            })
        })
        .collect();

    serde_json::from_value(serde_json::json!({
        "id": 1,
        "type": "root",
        "nodes": [{
            "id": 1000 + workspace_num as i64,
            "type": "workspace",
            "name": workspace_num.to_string(),
            "num": workspace_num,
            "nodes": nodes,
        }]
    }))
    .unwrap()
}
