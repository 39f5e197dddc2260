// SPDX-License-Identifier: MIT

//! Pending-launch records and the launch→window correlation score.
//!
//! A launcher wrapper notifies the daemon before spawning a process; when
//! a window appears shortly after, class, timing, and workspace signals
//! decide whether the window belongs to that launch.

use serde::{Deserialize, Serialize};

/// Minimum confidence for accepting a launch↔window match.
pub const MATCH_THRESHOLD: f64 = 0.6;

/// A launch notification awaiting its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLaunch {
    pub launch_id: String,
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub expected_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_number: Option<i32>,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub matched: bool,
}

/// Signals contributing to a correlation score, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSignals {
    pub class_match: bool,
    pub time_delta_ms: i64,
    pub time_score: f64,
    pub workspace_match: bool,
}

/// Attribution carried on the window record after a successful match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchCorrelation {
    pub launch_id: String,
    pub confidence: f64,
    pub signals: CorrelationSignals,
}

/// Score one pending launch against a newly observed window.
///
/// Class mismatch, a window that predates the launch, and a delta beyond
/// the 5 s correlation window all score 0.0. Otherwise: 0.5 baseline for
/// the class match, a recency bonus, and +0.2 when the workspace matches,
/// capped at 1.0.
pub fn launch_confidence(
    launch: &PendingLaunch,
    window_class: &str,
    window_workspace: Option<i32>,
    window_ts_ms: u64,
) -> (f64, CorrelationSignals) {
    let class_match = window_class.eq_ignore_ascii_case(&launch.expected_class);
    let time_delta_ms = window_ts_ms as i64 - launch.timestamp_ms as i64;
    let mut signals = CorrelationSignals {
        class_match,
        time_delta_ms,
        time_score: 0.0,
        workspace_match: false,
    };

    if !class_match {
        return (0.0, signals);
    }
    if time_delta_ms < 0 || time_delta_ms >= 5_000 {
        return (0.0, signals);
    }

    signals.time_score = if time_delta_ms < 1_000 {
        0.3
    } else if time_delta_ms < 2_000 {
        0.2
    } else {
        0.1
    };

    let mut confidence = 0.5 + signals.time_score;

    if let (Some(expected), Some(actual)) = (launch.workspace_number, window_workspace) {
        if expected == actual {
            signals.workspace_match = true;
            confidence += 0.2;
        }
    }

    (confidence.min(1.0), signals)
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
