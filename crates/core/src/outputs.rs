// SPDX-License-Identifier: MIT

//! Output role assignment.
//!
//! Roles are derived from a name-sorted list of active outputs so the
//! PRIMARY/SECONDARY/TERTIARY mapping is stable across reconnects and
//! headless-output reordering.

use serde::{Deserialize, Serialize};

/// Fallback output when nothing is active.
pub const FALLBACK_OUTPUT: &str = "eDP-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputRole {
    Primary,
    Secondary,
    Tertiary,
}

impl OutputRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "primary" => Some(OutputRole::Primary),
            "secondary" => Some(OutputRole::Secondary),
            "tertiary" => Some(OutputRole::Tertiary),
            _ => None,
        }
    }
}

/// Role → output-name cache, refreshed on mode entry and output events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRoles {
    pub primary: String,
    pub secondary: String,
    pub tertiary: String,
}

impl Default for OutputRoles {
    fn default() -> Self {
        Self {
            primary: FALLBACK_OUTPUT.to_string(),
            secondary: FALLBACK_OUTPUT.to_string(),
            tertiary: FALLBACK_OUTPUT.to_string(),
        }
    }
}

impl OutputRoles {
    /// Derive roles from the currently active outputs.
    ///
    /// Outputs are sorted by name; missing roles collapse onto the last
    /// available output, and an empty list falls back to [`FALLBACK_OUTPUT`].
    pub fn from_active_outputs(mut names: Vec<String>) -> Self {
        names.sort();
        match names.len() {
            0 => Self::default(),
            1 => Self {
                primary: names[0].clone(),
                secondary: names[0].clone(),
                tertiary: names[0].clone(),
            },
            2 => Self {
                primary: names[0].clone(),
                secondary: names[1].clone(),
                tertiary: names[1].clone(),
            },
            _ => Self {
                primary: names[0].clone(),
                secondary: names[1].clone(),
                tertiary: names[2].clone(),
            },
        }
    }

    pub fn get(&self, role: OutputRole) -> &str {
        match role {
            OutputRole::Primary => &self.primary,
            OutputRole::Secondary => &self.secondary,
            OutputRole::Tertiary => &self.tertiary,
        }
    }

    /// Output for a workspace by the static distribution rules
    /// (1–2 primary, 3–5 secondary, 6+ tertiary).
    pub fn output_for_workspace(&self, workspace: u32) -> &str {
        self.get(role_for_workspace(workspace))
    }
}

/// Static workspace → role distribution.
pub fn role_for_workspace(workspace: u32) -> OutputRole {
    match workspace {
        1 | 2 => OutputRole::Primary,
        3..=5 => OutputRole::Secondary,
        _ => OutputRole::Tertiary,
    }
}

#[cfg(test)]
#[path = "outputs_tests.rs"]
mod tests;
