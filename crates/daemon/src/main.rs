// SPDX-License-Identifier: MIT

//! i3pmd, the window-project daemon.
//!
//! Owns the WM event loop: identity resolution, rule execution, project
//! switching, launch correlation, input modes, and the RPC surface.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::io::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use i3pm_core::{Clock, Event, EventRing, Source, SystemClock};
use i3pm_engine::{
    IdentityResolver, LaunchRegistry, ModeManager, ProcEnvReader, ProcessLauncher,
    ProjectSwitcher, RuleEngine, SwitcherDeps,
};
use i3pm_storage::{
    load_active_project, load_classification, load_focus_state, load_project_configs,
    load_window_rules, StateStore, WorkspaceTracker,
};
use i3pm_wm::{EventClass, WmConnection, XpropPidProbe};

use i3pm_daemon::lifecycle::{self, Config, LifecycleError};
use i3pm_daemon::listener::{Broadcaster, Listener};
use i3pm_daemon::router::{ConfigPaths, Router, RouterFlow};
use i3pm_daemon::service::ProjectService;
use i3pm_daemon::watcher::{watch_config_files, ConfigChange};
use i3pm_daemon::wm_handle::WmHandle;

/// Event classes the project daemon consumes.
const SUBSCRIPTIONS: &[EventClass] = &[
    EventClass::Window,
    EventClass::Workspace,
    EventClass::Output,
    EventClass::Mode,
    EventClass::Tick,
    EventClass::Shutdown,
];

/// Connect attempts before giving up at startup.
const CONNECT_ATTEMPTS: u32 = 10;

/// Tracker stale-entry sweep interval.
const TRACKER_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Socket health-check interval.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Overall shutdown budget.
const SHUTDOWN_BUDGET: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("i3pmd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("i3pmd {}", env!("CARGO_PKG_VERSION"));
                println!("Window-project daemon for i3/Sway");
                println!();
                println!("USAGE:");
                println!("    i3pmd");
                println!();
                println!("The daemon is typically started by the user session (systemd");
                println!("unit or WM exec) and serves queries over a local socket.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: i3pmd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    lifecycle::rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let _log_guard = lifecycle::setup_logging(&config)?;

    info!("starting window-project daemon");

    let _lock = match lifecycle::acquire_lock(&config) {
        Ok(lock) => lock,
        Err(LifecycleError::LockFailed(path)) => {
            let pid = std::fs::read_to_string(&path).unwrap_or_default();
            eprintln!("i3pmd is already running");
            if !pid.trim().is_empty() {
                eprintln!("  pid: {}", pid.trim());
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    run(config).await
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let clock = Arc::new(SystemClock);
    let start_time = Instant::now();

    // Materialized state from config + persisted files
    let state = Arc::new(Mutex::new(StateStore::new()));
    {
        let mut s = state.lock();
        s.projects = load_project_configs(&config.projects_dir);
        info!(count = s.projects.len(), "projects loaded");

        match load_classification(&config.app_classes_path) {
            Ok(classification) => s.classification = classification,
            Err(e) => warn!(error = %e, "classification load failed, using defaults"),
        }

        let active = load_active_project(&config.active_project_path)?;
        s.set_active_project(active.project_name);

        s.focus = load_focus_state(&config.focus_state_path)?;
    }

    let tracker = Arc::new(Mutex::new(WorkspaceTracker::load(&config.tracker_path)?));

    let rules = RuleEngine::new(match load_window_rules(&config.window_rules_path) {
        Ok(rules) => {
            info!(count = rules.len(), "window rules loaded");
            rules
        }
        Err(e) => {
            warn!(error = %e, "window rules load failed, starting empty");
            Vec::new()
        }
    });

    // WM session
    let (conn, mut events) = WmConnection::connect_with_retry(CONNECT_ATTEMPTS).await?;
    let wm = WmHandle::new(Arc::new(conn));
    state.lock().connected = true;

    // RPC socket must bind before READY
    let rpc_socket = lifecycle::bind_rpc_socket(&config)?;

    let ring = Arc::new(Mutex::new(EventRing::default()));
    let broadcaster = Broadcaster::new();
    let registry = Arc::new(Mutex::new(LaunchRegistry::new(clock.clone())));

    // Switch coordinator worker
    let (internal_tx, mut internal_rx) = tokio::sync::mpsc::unbounded_channel();
    let (switcher, switch_worker) = ProjectSwitcher::spawn(SwitcherDeps {
        wm: Arc::new(wm.clone()),
        state: Arc::clone(&state),
        tracker: Arc::clone(&tracker),
        clock: clock.clone(),
        launcher: Arc::new(ProcessLauncher),
        active_project_path: config.active_project_path.clone(),
        events_tx: internal_tx,
    });

    // Mode manager
    let (mode_tx, mut mode_rx) = tokio::sync::mpsc::unbounded_channel();
    let mode = Arc::new(tokio::sync::Mutex::new(ModeManager::new(
        Arc::new(wm.clone()),
        switcher.clone(),
        Arc::clone(&state),
        clock.clone(),
        mode_tx,
    )));

    let resolver = IdentityResolver::new(Arc::new(ProcEnvReader), Arc::new(XpropPidProbe));
    let router = Arc::new(Router::new(
        Arc::new(wm.clone()),
        Arc::clone(&state),
        Arc::clone(&tracker),
        Arc::clone(&ring),
        broadcaster.clone(),
        rules,
        resolver,
        Arc::clone(&registry),
        Arc::clone(&mode),
        clock.clone(),
        ConfigPaths {
            app_classes: config.app_classes_path.clone(),
            window_rules: config.window_rules_path.clone(),
            focus_state: config.focus_state_path.clone(),
        },
    ));

    // RPC listener
    let health_wm = wm.clone();
    let service = Arc::new(ProjectService {
        state: Arc::clone(&state),
        ring: Arc::clone(&ring),
        switcher: switcher.clone(),
        registry: Arc::clone(&registry),
        mode: Arc::clone(&mode),
        router: Arc::clone(&router),
        broadcaster: broadcaster.clone(),
        health: Arc::new(move || Some(health_wm.current().health(true))),
        start_time,
    });
    let listener = Listener::new(rpc_socket, service, broadcaster.clone());
    let listener_task = tokio::spawn(listener.run());

    // Config file watcher (hot reload)
    let watcher = watch_config_files(
        &config.window_rules_path,
        &config.app_classes_path,
        &config.output_states_path,
    );
    let (_watch_guard, _idle_tx, mut config_changes) = match watcher {
        Ok((guard, rx)) => (Some(guard), None, rx),
        Err(e) => {
            // Tick-driven reloads still work without the watcher
            warn!(error = %e, "config watcher unavailable, hot reload disabled");
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            (None, Some(tx), rx)
        }
    };

    // Connect-time state recovery, then subscribe before consuming events
    if let Err(e) = router.rebuild_state().await {
        warn!(error = %e, "initial state rebuild failed");
    }
    wm.current().subscribe(SUBSCRIPTIONS).await?;
    if let Err(e) = router.startup_scan().await {
        warn!(error = %e, "startup scan failed");
    }

    router.record_event(
        Event::DaemonStart {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        Source::Daemon,
    );

    // Service-manager integration
    lifecycle::sd_notify("READY=1");
    if let Some(interval) = lifecycle::watchdog_interval() {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                lifecycle::sd_notify("WATCHDOG=1");
            }
        });
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut tracker_sweep = tokio::time::interval(TRACKER_SWEEP_INTERVAL);
    tracker_sweep.tick().await; // first tick fires immediately
    let mut health_check = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    health_check.tick().await;

    info!(socket = %config.socket_path.display(), "daemon ready");

    // Main loop
    loop {
        tokio::select! {
            maybe_event = events.next() => {
                match maybe_event {
                    Some(event) => match router.handle_wm_event(event).await {
                        RouterFlow::Continue => {}
                        RouterFlow::Reconnect => {
                            if let Some(new_events) = reconnect(&wm, &router, &state).await {
                                events = new_events;
                            } else {
                                break;
                            }
                        }
                        RouterFlow::Exit => break,
                    },
                    None => {
                        warn!("WM event stream closed");
                        state.lock().connected = false;
                        if let Some(new_events) = reconnect(&wm, &router, &state).await {
                            events = new_events;
                        } else {
                            break;
                        }
                    }
                }
            }

            Some((event, source)) = internal_rx.recv() => {
                router.record_event(event, source);
            }

            Some(notification) = mode_rx.recv() => {
                match serde_json::to_value(&notification) {
                    Ok(params) => broadcaster.broadcast(notification.method(), params),
                    Err(e) => error!(error = %e, "unserializable mode notification"),
                }
            }

            Some(change) = config_changes.recv() => {
                match change {
                    ConfigChange::WindowRules | ConfigChange::AppClasses => router.reload_config(),
                    ConfigChange::OutputStates => {
                        let mut mode = mode.lock().await;
                        mode.refresh_output_cache().await;
                        router.record_event(
                            Event::ConfigReload { kind: "output-states".to_string() },
                            Source::Daemon,
                        );
                    }
                }
            }

            _ = tracker_sweep.tick() => {
                sweep_tracker(&wm, &tracker, clock.as_ref()).await;
            }

            // Sway restarts leave the daemon attached to a dead socket
            // without a shutdown event; probe and rediscover
            _ = health_check.tick() => {
                let conn = wm.current();
                let healthy = conn.socket_is_current()
                    && conn.validate(clock.now_ms()).await.is_ok();
                if !healthy {
                    warn!("socket health check failed, reconnecting");
                    state.lock().connected = false;
                    if let Some(new_events) = reconnect(&wm, &router, &state).await {
                        events = new_events;
                    } else {
                        break;
                    }
                }
            }

            _ = sigterm.recv() => {
                info!("SIGTERM received");
                break;
            }
            _ = sigint.recv() => {
                info!("SIGINT received");
                break;
            }
        }
    }

    // Bounded shutdown
    lifecycle::sd_notify("STOPPING=1");
    let shutdown = async {
        router.record_event(Event::DaemonStop, Source::Daemon);
        drop(switcher);
        let _ = tokio::time::timeout(Duration::from_secs(2), switch_worker).await;
        listener_task.abort();
        let tracker_save = { tracker.lock().save() };
        if let Err(e) = tracker_save {
            warn!(error = %e, "final tracker save failed");
        }
    };
    if tokio::time::timeout(SHUTDOWN_BUDGET, shutdown).await.is_err() {
        warn!("shutdown budget exceeded, exiting anyway");
    }

    info!("daemon stopped");
    Ok(())
}

/// Reconnect after a lost socket: rediscover, re-open, resubscribe, and
/// rebuild state. `None` means the WM is gone for good.
async fn reconnect(
    wm: &WmHandle,
    router: &Router,
    state: &Arc<Mutex<StateStore>>,
) -> Option<i3pm_wm::EventStream> {
    let previous_reconnects = wm.current().reconnection_count();

    match WmConnection::connect_with_retry(CONNECT_ATTEMPTS).await {
        Ok((conn, events)) => {
            conn.mark_reconnected(previous_reconnects);
            // Downstream RPC clients resolve the socket through these
            let socket = conn.socket_path().display().to_string();
            std::env::set_var("SWAYSOCK", &socket);
            std::env::set_var("I3SOCK", &socket);

            wm.replace(Arc::new(conn));
            state.lock().connected = true;

            if let Err(e) = wm.current().subscribe(SUBSCRIPTIONS).await {
                error!(error = %e, "resubscribe failed");
                return None;
            }
            if let Err(e) = router.rebuild_state().await {
                warn!(error = %e, "post-reconnect rebuild failed");
            }
            info!(%socket, "reconnected to WM");
            Some(events)
        }
        Err(e) => {
            error!(error = %e, "reconnect failed");
            None
        }
    }
}

/// Drop stale tracker entries (dead windows, 30-day age-out).
async fn sweep_tracker(
    wm: &WmHandle,
    tracker: &Arc<Mutex<WorkspaceTracker>>,
    clock: &dyn i3pm_core::Clock,
) {
    let live: std::collections::HashSet<i64> = match wm.current().get_tree().await {
        Ok(tree) => tree.window_ids().into_iter().collect(),
        Err(e) => {
            warn!(error = %e, "tracker sweep skipped, tree unavailable");
            return;
        }
    };

    let removed = {
        let mut tracker = tracker.lock();
        let removed = tracker.cleanup_stale_entries(
            &live,
            i3pm_storage::DEFAULT_MAX_AGE_DAYS,
            clock.now_secs(),
        );
        if removed > 0 {
            if let Err(e) = tracker.save() {
                warn!(error = %e, "tracker save after sweep failed");
            }
        }
        removed
    };
    if removed > 0 {
        info!(removed, "tracker sweep complete");
    }
}

/// Startup marker appended to the log before tracing is installed.
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "--- i3pmd: starting (pid: {}) ---\n", std::process::id())?;
    Ok(())
}
