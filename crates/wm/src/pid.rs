// SPDX-License-Identifier: MIT

//! PID acquisition fallback via `xprop`.
//!
//! Sway exposes the PID on the container; plain i3 does not, so the
//! resolver falls back to `xprop -id <surface_id> _NET_WM_PID`. The probe
//! is pluggable: environments without `xprop` use [`NoPidProbe`] and the
//! resolver degrades to class-based identity.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Subprocess timeout for the xprop call.
pub const XPROP_TIMEOUT: Duration = Duration::from_secs(1);

#[async_trait]
pub trait PidProbe: Send + Sync {
    /// Best-effort PID for an X11 surface; `None` on any failure.
    async fn probe(&self, surface_id: i64) -> Option<i32>;
}

/// Probe that never finds a PID (Wayland-only setups, missing xprop).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPidProbe;

#[async_trait]
impl PidProbe for NoPidProbe {
    async fn probe(&self, _surface_id: i64) -> Option<i32> {
        None
    }
}

/// `xprop`-backed probe with a 1-second timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct XpropPidProbe;

#[async_trait]
impl PidProbe for XpropPidProbe {
    async fn probe(&self, surface_id: i64) -> Option<i32> {
        let output = tokio::time::timeout(
            XPROP_TIMEOUT,
            tokio::process::Command::new("xprop")
                .arg("-id")
                .arg(surface_id.to_string())
                .arg("_NET_WM_PID")
                .output(),
        )
        .await;

        match output {
            Ok(Ok(out)) if out.status.success() => {
                parse_xprop_pid(&String::from_utf8_lossy(&out.stdout))
            }
            Ok(Ok(out)) => {
                debug!(surface_id, status = ?out.status, "xprop returned non-zero");
                None
            }
            Ok(Err(e)) => {
                debug!(surface_id, error = %e, "xprop failed to spawn");
                None
            }
            Err(_) => {
                debug!(surface_id, "xprop timed out");
                None
            }
        }
    }
}

/// Parse `_NET_WM_PID(CARDINAL) = 1234` output.
pub fn parse_xprop_pid(stdout: &str) -> Option<i32> {
    let (_, value) = stdout.split_once('=')?;
    value.trim().parse().ok()
}

#[cfg(test)]
#[path = "pid_tests.rs"]
mod tests;
