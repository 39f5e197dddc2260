// SPDX-License-Identifier: MIT

//! i3pm-treed, the tree-diff daemon.
//!
//! Captures a snapshot of the WM tree on every event, computes a
//! Merkle-pruned structural diff, correlates changes to preceding user
//! input, and serves the history over RPC.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use i3pm_core::{EventRing, SystemClock};
use i3pm_engine::ProcEnvReader;
use i3pm_wm::{EventClass, WmConnection};

use i3pm_daemon::lifecycle::{self, Config, LifecycleError};
use i3pm_daemon::listener::{Broadcaster, Listener};
use i3pm_daemon::router::RouterFlow;
use i3pm_daemon::tree_router::TreeRouter;
use i3pm_daemon::tree_service::TreeService;
use i3pm_daemon::wm_handle::WmHandle;

/// Event classes the tree-diff daemon consumes (bindings included).
const SUBSCRIPTIONS: &[EventClass] = &[
    EventClass::Window,
    EventClass::Workspace,
    EventClass::Output,
    EventClass::Mode,
    EventClass::Binding,
    EventClass::Tick,
    EventClass::Shutdown,
];

const CONNECT_ATTEMPTS: u32 = 10;

/// Periodic hash-cache sweep.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Memory introspection logging interval.
const MEMORY_LOG_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("i3pm-treed {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("i3pm-treed {}", env!("CARGO_PKG_VERSION"));
                println!("Tree-diff daemon for i3/Sway");
                println!();
                println!("USAGE:");
                println!("    i3pm-treed");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load_tree()?;
    lifecycle::rotate_log_if_needed(&config.log_path);
    let _log_guard = lifecycle::setup_logging(&config)?;

    info!("starting tree-diff daemon");

    let _lock = match lifecycle::acquire_lock(&config) {
        Ok(lock) => lock,
        Err(LifecycleError::LockFailed(_)) => {
            eprintln!("i3pm-treed is already running");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let clock = Arc::new(SystemClock);
    let start_time = Instant::now();

    let (conn, mut events) = WmConnection::connect_with_retry(CONNECT_ATTEMPTS).await?;
    let wm = WmHandle::new(Arc::new(conn));

    let rpc_socket = lifecycle::bind_rpc_socket(&config)?;
    let ring = Arc::new(Mutex::new(EventRing::default()));
    let broadcaster = Broadcaster::new();

    let router = Arc::new(tokio::sync::Mutex::new(TreeRouter::new(
        Arc::new(wm.clone()),
        Arc::new(ProcEnvReader),
        Arc::clone(&ring),
        broadcaster.clone(),
        clock,
    )));

    let service = Arc::new(TreeService {
        ring: Arc::clone(&ring),
        router: Arc::clone(&router),
        broadcaster: broadcaster.clone(),
        start_time,
    });
    let listener = Listener::new(rpc_socket, service, broadcaster.clone());
    let listener_task = tokio::spawn(listener.run());

    wm.current().subscribe(SUBSCRIPTIONS).await?;

    // Baseline snapshot so the first event diffs against something
    {
        let mut router = router.lock().await;
        router.capture_and_diff("daemon::start").await;
    }

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
    let mut cache_sweep = tokio::time::interval(CACHE_SWEEP_INTERVAL);
    cache_sweep.tick().await;
    let mut memory_log = tokio::time::interval(MEMORY_LOG_INTERVAL);
    memory_log.tick().await;

    info!(socket = %config.socket_path.display(), "tree-diff daemon ready");

    loop {
        tokio::select! {
            maybe_event = events.next() => {
                match maybe_event {
                    Some(event) => {
                        let flow = {
                            let mut router = router.lock().await;
                            router.handle_wm_event(event).await
                        };
                        match flow {
                            RouterFlow::Continue => {}
                            RouterFlow::Reconnect => {
                                match reconnect(&wm).await {
                                    Some(new_events) => events = new_events,
                                    None => break,
                                }
                            }
                            RouterFlow::Exit => break,
                        }
                    }
                    None => {
                        warn!("WM event stream closed");
                        match reconnect(&wm).await {
                            Some(new_events) => events = new_events,
                            None => break,
                        }
                    }
                }
            }

            _ = cache_sweep.tick() => {
                let mut router = router.lock().await;
                router.sweep_cache();
            }

            _ = memory_log.tick() => {
                let router = router.lock().await;
                let stats = router.stats();
                info!(
                    cache_entries = stats.cache.size,
                    events_captured = stats.events_captured,
                    diffs = stats.diffs_computed,
                    "memory introspection"
                );
            }

            _ = sigterm.recv() => { info!("SIGTERM received"); break; }
            _ = sigint.recv() => { info!("SIGINT received"); break; }
        }
    }

    lifecycle::sd_notify("STOPPING=1");
    listener_task.abort();
    info!("tree-diff daemon stopped");
    Ok(())
}

async fn reconnect(wm: &WmHandle) -> Option<i3pm_wm::EventStream> {
    let previous = wm.current().reconnection_count();
    match WmConnection::connect_with_retry(CONNECT_ATTEMPTS).await {
        Ok((conn, events)) => {
            conn.mark_reconnected(previous);
            let socket = conn.socket_path().display().to_string();
            std::env::set_var("SWAYSOCK", &socket);
            std::env::set_var("I3SOCK", &socket);
            wm.replace(Arc::new(conn));
            if let Err(e) = wm.current().subscribe(SUBSCRIPTIONS).await {
                warn!(error = %e, "resubscribe failed");
                return None;
            }
            info!(%socket, "reconnected to WM");
            Some(events)
        }
        Err(e) => {
            warn!(error = %e, "reconnect failed");
            None
        }
    }
}
