// SPDX-License-Identifier: MIT

//! WM socket discovery.
//!
//! Prefers the environment (`SWAYSOCK`, then `I3SOCK`); otherwise scans
//! the user's runtime directory for `sway-ipc.*.sock` (falling back to
//! `i3-ipc.*.sock`) and picks the most recently modified candidate. Sway
//! restarts leave stale sockets behind, hence the mtime preference.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Socket path from the environment, if set.
pub fn socket_from_env() -> Option<PathBuf> {
    for var in ["SWAYSOCK", "I3SOCK"] {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                return Some(PathBuf::from(value));
            }
        }
    }
    None
}

/// The user's runtime directory (`/run/user/<uid>`).
pub fn runtime_dir() -> PathBuf {
    let uid = nix::unistd::getuid().as_raw();
    PathBuf::from(format!("/run/user/{uid}"))
}

/// Discover the current WM socket: environment first, then runtime-dir
/// scan.
pub fn discover_socket() -> Option<PathBuf> {
    if let Some(path) = socket_from_env() {
        if path.exists() {
            return Some(path);
        }
    }
    scan_runtime_dir(&runtime_dir())
}

/// Scan a directory for WM sockets, newest mtime wins.
pub fn scan_runtime_dir(dir: &Path) -> Option<PathBuf> {
    newest_matching(dir, "sway-ipc.", ".sock").or_else(|| newest_matching(dir, "i3-ipc.", ".sock"))
}

fn newest_matching(dir: &Path, prefix: &str, suffix: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(prefix) || !name.ends_with(suffix) {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        match &best {
            Some((newest, _)) if *newest >= mtime => {}
            _ => best = Some((mtime, entry.path())),
        }
    }

    best.map(|(_, path)| path)
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
