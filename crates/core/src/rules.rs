// SPDX-License-Identifier: MIT

//! Window-new rules: match criteria plus ordered actions.
//!
//! Actions are a tagged variant executed in declared order; a failing
//! action never aborts the ones after it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::window::WindowRecord;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid title pattern '{pattern}': {reason}")]
    InvalidTitlePattern { pattern: String, reason: String },
}

/// Split/container layouts a rule may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    Tabbed,
    Stacked,
    Splitv,
    Splith,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Tabbed => "tabbed",
            LayoutMode::Stacked => "stacked",
            LayoutMode::Splitv => "splitv",
            LayoutMode::Splith => "splith",
        }
    }
}

/// One action within a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleAction {
    /// Move the window to a workspace (validated against active outputs).
    Workspace {
        target: i32,
        /// Also focus the target workspace afterwards.
        #[serde(default)]
        follow: bool,
    },
    /// Add a mark (addressed by surface ID, the form the WM requires).
    Mark { value: String },
    Float { enable: bool },
    Layout { mode: LayoutMode },
}

impl RuleAction {
    /// Short name used in action outcome reports.
    pub fn name(&self) -> &'static str {
        match self {
            RuleAction::Workspace { .. } => "workspace",
            RuleAction::Mark { .. } => "mark",
            RuleAction::Float { .. } => "float",
            RuleAction::Layout { .. } => "layout",
        }
    }
}

/// Outcome of one executed action, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok(action: &RuleAction) -> Self {
        Self {
            action: action.name().to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failed(action: &RuleAction, error: impl Into<String>) -> Self {
        Self {
            action: action.name().to_string(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Predicate over a fresh window record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Regex over the window title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_pattern: Option<String>,
    /// Mark that must be present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_mark: Option<String>,
    /// Mark that must be absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_mark: Option<String>,
}

impl MatchCriteria {
    /// Whether every set criterion holds for the window.
    pub fn matches(&self, window: &WindowRecord) -> Result<bool, RuleError> {
        if let Some(class) = &self.class {
            if *class != window.class {
                return Ok(false);
            }
        }
        if let Some(instance) = &self.instance {
            if *instance != window.instance {
                return Ok(false);
            }
        }
        if let Some(pattern) = &self.title_pattern {
            let re = regex::Regex::new(pattern).map_err(|e| RuleError::InvalidTitlePattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            if !re.is_match(&window.title) {
                return Ok(false);
            }
        }
        if let Some(mark) = &self.has_mark {
            if !window.marks.iter().any(|m| m == mark) {
                return Ok(false);
            }
        }
        if let Some(mark) = &self.not_mark {
            if window.marks.iter().any(|m| m == mark) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// A rule from `window-rules.json`. Rules are evaluated in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRule {
    #[serde(rename = "match")]
    pub criteria: MatchCriteria,
    pub actions: Vec<RuleAction>,
    #[serde(default)]
    pub priority: i32,
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
