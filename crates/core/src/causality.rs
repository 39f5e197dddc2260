// SPDX-License-Identifier: MIT

//! Multi-factor confidence scoring for user-action → tree-event causality.
//!
//! Four weighted factors: temporal proximity (40%), semantic relevance
//! (30%), exclusivity within the correlation window (20%), and cascade
//! depth (10%).

use serde::{Deserialize, Serialize};

/// How long after an action an effect may still be attributed to it.
pub const CORRELATION_WINDOW_MS: u64 = 500;

/// Kind of user input that may cause tree changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Binding,
    IpcCommand,
    Keypress,
    MouseClick,
}

/// A recorded user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAction {
    pub action_id: u64,
    pub timestamp_ms: u64,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub command: String,
}

/// Confidence labels for correlation scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryLikely,
    Likely,
    Possible,
    Unlikely,
    VeryUnlikely,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            ConfidenceLevel::VeryLikely
        } else if score >= 0.7 {
            ConfidenceLevel::Likely
        } else if score >= 0.5 {
            ConfidenceLevel::Possible
        } else if score >= 0.3 {
            ConfidenceLevel::Unlikely
        } else {
            ConfidenceLevel::VeryUnlikely
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryLikely => "very likely",
            ConfidenceLevel::Likely => "likely",
            ConfidenceLevel::Possible => "possible",
            ConfidenceLevel::Unlikely => "unlikely",
            ConfidenceLevel::VeryUnlikely => "very unlikely",
        }
    }
}

/// Per-factor scores, kept alongside the final confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub temporal: f64,
    pub semantic: f64,
    pub exclusivity: f64,
    pub cascade: f64,
}

/// One scored attribution of a tree event to a user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCorrelation {
    pub correlation_id: String,
    pub action_id: u64,
    pub tree_event_id: u64,
    pub time_delta_ms: i64,
    pub confidence: f64,
    pub level: ConfidenceLevel,
    pub factors: FactorBreakdown,
    pub cascade_depth: u32,
    pub reasoning: String,
}

/// Temporal proximity score by action→event delta.
pub fn temporal_score(time_delta_ms: u64) -> f64 {
    match time_delta_ms {
        0..=50 => 1.0,
        51..=100 => 0.9,
        101..=200 => 0.7,
        201..=350 => 0.5,
        _ => 0.3,
    }
}

/// Semantic relevance of (action type, event type).
pub fn semantic_score(action_type: ActionType, event_type: &str) -> f64 {
    match action_type {
        ActionType::Binding => {
            if event_type.starts_with("window::") || event_type.starts_with("workspace::") {
                0.6
            } else {
                0.3
            }
        }
        ActionType::IpcCommand => 0.7,
        ActionType::Keypress => 0.5,
        ActionType::MouseClick => {
            if event_type.contains("focus") || event_type.contains("move") {
                0.7
            } else {
                0.4
            }
        }
    }
}

/// Exclusivity score by count of competing actions in the window.
pub fn exclusivity_score(competing_actions: usize) -> f64 {
    match competing_actions {
        0 => 1.0,
        1 => 0.7,
        2 => 0.5,
        _ => 0.3,
    }
}

/// Cascade score by chain depth (0 = primary effect).
pub fn cascade_score(cascade_depth: u32) -> f64 {
    match cascade_depth {
        0 => 1.0,
        1 => 0.7,
        2 => 0.4,
        _ => 0.2,
    }
}

/// Weighted final score with breakdown and human-readable reasoning.
pub fn calculate_confidence(
    action: &UserAction,
    event_type: &str,
    time_delta_ms: u64,
    competing_actions: usize,
    cascade_depth: u32,
) -> (f64, ConfidenceLevel, FactorBreakdown, String) {
    let factors = FactorBreakdown {
        temporal: temporal_score(time_delta_ms),
        semantic: semantic_score(action.action_type, event_type),
        exclusivity: exclusivity_score(competing_actions),
        cascade: cascade_score(cascade_depth),
    };

    let confidence = factors.temporal * 0.40
        + factors.semantic * 0.30
        + factors.exclusivity * 0.20
        + factors.cascade * 0.10;
    let level = ConfidenceLevel::from_score(confidence);

    let reasoning = format!(
        "{}ms after {:?} ({}), {} competing, cascade depth {}",
        time_delta_ms, action.action_type, event_type, competing_actions, cascade_depth
    );

    (confidence, level, factors, reasoning)
}

#[cfg(test)]
#[path = "causality_tests.rs"]
mod tests;
