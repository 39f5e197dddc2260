// SPDX-License-Identifier: MIT

//! Daemon lifecycle: paths, process lock, logging, and service-manager
//! integration.

use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no usable state directory")]
    NoStateDir,

    #[error("another instance holds the lock at {0}")]
    LockFailed(PathBuf),

    #[error("cannot bind RPC socket at {path}: {source}")]
    BindFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Paths for one daemon instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// State directory (`$XDG_STATE_HOME/i3pm` or `~/.local/state/i3pm`).
    pub state_dir: PathBuf,
    /// Configuration directory (`$XDG_CONFIG_HOME/i3pm` or `~/.config/i3pm`).
    pub config_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub tracker_path: PathBuf,
    pub active_project_path: PathBuf,
    pub focus_state_path: PathBuf,
    pub projects_dir: PathBuf,
    pub app_classes_path: PathBuf,
    pub window_rules_path: PathBuf,
    pub output_states_path: PathBuf,
}

impl Config {
    /// Paths for the window-project daemon.
    pub fn load() -> Result<Self, LifecycleError> {
        Self::for_daemon("i3pmd")
    }

    /// Paths for the tree-diff daemon (separate socket/lock/log).
    pub fn load_tree() -> Result<Self, LifecycleError> {
        Self::for_daemon("i3pm-treed")
    }

    fn for_daemon(name: &str) -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        let config_dir = config_dir()?;

        Ok(Self {
            socket_path: state_dir.join(format!("{name}.sock")),
            lock_path: state_dir.join(format!("{name}.pid")),
            log_path: state_dir.join(format!("{name}.log")),
            tracker_path: config_dir.join("window-workspace-map.json"),
            active_project_path: config_dir.join("active-project.json"),
            focus_state_path: state_dir.join("focus-state.json"),
            projects_dir: config_dir.join("projects"),
            app_classes_path: config_dir.join("app-classes.json"),
            window_rules_path: config_dir.join("window-rules.json"),
            output_states_path: config_dir.join("output-states.json"),
            state_dir,
            config_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir).join("i3pm"));
        }
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/i3pm"))
}

fn config_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir).join("i3pm"));
        }
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".config/i3pm"))
}

/// Acquire the single-instance lock, writing our PID into it.
pub fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&config.lock_path)?;

    if file.try_lock_exclusive().is_err() {
        return Err(LifecycleError::LockFailed(config.lock_path.clone()));
    }

    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Bind the RPC socket: adopt a service-manager socket (fd 3) when one
/// was passed, else create our own in the state directory.
pub fn bind_rpc_socket(config: &Config) -> Result<UnixListener, LifecycleError> {
    if let Some(listener) = socket_activation_listener()? {
        info!("using service-manager provided socket (fd 3)");
        return Ok(listener);
    }

    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    UnixListener::bind(&config.socket_path).map_err(|source| LifecycleError::BindFailed {
        path: config.socket_path.clone(),
        source,
    })
}

/// `LISTEN_FDS`/`LISTEN_PID` socket adoption, one socket at fd 3.
fn socket_activation_listener() -> Result<Option<UnixListener>, LifecycleError> {
    let fds: u32 = match std::env::var("LISTEN_FDS").ok().and_then(|v| v.parse().ok()) {
        Some(fds) => fds,
        None => return Ok(None),
    };
    if fds == 0 {
        return Ok(None);
    }

    if let Some(pid) = std::env::var("LISTEN_PID").ok().and_then(|v| v.parse::<u32>().ok()) {
        if pid != std::process::id() {
            warn!(listen_pid = pid, "LISTEN_PID is not us, ignoring socket activation");
            return Ok(None);
        }
    }

    // fd 3 is the first passed descriptor by convention
    #[allow(unsafe_code)]
    let std_listener = unsafe {
        use std::os::fd::FromRawFd;
        std::os::unix::net::UnixListener::from_raw_fd(3)
    };
    std_listener.set_nonblocking(true)?;
    Ok(Some(UnixListener::from_std(std_listener)?))
}

/// Send one line to `$NOTIFY_SOCKET` (READY=1, WATCHDOG=1, STOPPING=1).
/// Best-effort: absence of the socket just means no service manager.
pub fn sd_notify(state: &str) {
    let Ok(socket_path) = std::env::var("NOTIFY_SOCKET") else {
        return;
    };
    // Abstract-namespace sockets (leading '@') are not supported here
    if socket_path.starts_with('@') {
        debug!("abstract NOTIFY_SOCKET not supported, skipping notify");
        return;
    }

    match std::os::unix::net::UnixDatagram::unbound() {
        Ok(socket) => {
            if let Err(e) = socket.send_to(state.as_bytes(), &socket_path) {
                debug!(error = %e, state, "sd_notify send failed");
            }
        }
        Err(e) => debug!(error = %e, "sd_notify socket failed"),
    }
}

/// Watchdog ping interval: a third of `WATCHDOG_USEC`, when set.
pub fn watchdog_interval() -> Option<std::time::Duration> {
    let usec: u64 = std::env::var("WATCHDOG_USEC").ok()?.parse().ok()?;
    if usec == 0 {
        return None;
    }
    Some(std::time::Duration::from_micros(usec / 3))
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the log at startup when it has grown too large.
pub fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Install the tracing subscriber writing to the daemon log file.
pub fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
