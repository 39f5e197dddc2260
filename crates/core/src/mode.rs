// SPDX-License-Identifier: MIT

//! Pure pieces of the transient input mode: digit parsing, fuzzy project
//! matching, and the scored project filter that feeds the preview pane.
//!
//! The stateful transitions live in the engine's mode manager; everything
//! here is a plain function over the accumulated input.

use serde::{Deserialize, Serialize};

/// Highest addressable workspace number.
pub const MAX_WORKSPACE: u32 = 70;

/// Transient mode kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeType {
    Goto,
    Move,
    Project,
}

impl ModeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeType::Goto => "goto",
            ModeType::Move => "move",
            ModeType::Project => "project",
        }
    }
}

/// What the accumulated input currently addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Workspace,
    Project,
    None,
}

/// Parsed digit accumulator: a workspace and an optional monitor index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceTarget {
    pub workspace: u32,
    /// `HEADLESS-<i>` output name when a third digit selected a monitor.
    pub monitor: Option<String>,
}

/// Parse accumulated digits.
///
/// 1–2 digits: workspace 1–70. 3 digits: first two are the workspace,
/// the third is a monitor index 1–3 (`HEADLESS-<i>`). Anything else is
/// invalid.
pub fn parse_workspace_digits(digits: &str) -> Option<WorkspaceTarget> {
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    if digits.len() <= 2 {
        let workspace: u32 = digits.parse().ok()?;
        if (1..=MAX_WORKSPACE).contains(&workspace) {
            return Some(WorkspaceTarget {
                workspace,
                monitor: None,
            });
        }
        return None;
    }

    let workspace: u32 = digits[..2].parse().ok()?;
    let monitor: u32 = digits[2..].parse().ok()?;
    if (1..=MAX_WORKSPACE).contains(&workspace) && (1..=3).contains(&monitor) {
        Some(WorkspaceTarget {
            workspace,
            monitor: Some(format!("HEADLESS-{monitor}")),
        })
    } else {
        None
    }
}

/// Single-winner fuzzy project match used on execute.
///
/// Priority: exact, prefix (alphabetically first), substring
/// (alphabetically first), then first-character match for single-char
/// input. Names are compared case-insensitively.
pub fn fuzzy_match_project<'a>(chars: &str, names: &'a [String]) -> Option<&'a str> {
    if chars.is_empty() {
        return None;
    }
    let query = chars.to_lowercase();

    if let Some(name) = names.iter().find(|n| n.to_lowercase() == query) {
        return Some(name);
    }

    let mut prefix: Vec<&String> = names
        .iter()
        .filter(|n| n.to_lowercase().starts_with(&query))
        .collect();
    if !prefix.is_empty() {
        prefix.sort();
        return Some(prefix[0]);
    }

    let mut substring: Vec<&String> = names
        .iter()
        .filter(|n| n.to_lowercase().contains(&query))
        .collect();
    if !substring.is_empty() {
        substring.sort();
        return Some(substring[0]);
    }

    if query.len() == 1 {
        let mut first_char: Vec<&String> = names
            .iter()
            .filter(|n| n.to_lowercase().starts_with(&query))
            .collect();
        if !first_char.is_empty() {
            first_char.sort();
            return Some(first_char[0]);
        }
    }

    None
}

/// Score a query against one name for the preview list.
///
/// Exact 1000; prefix 500 plus a length-ratio bonus; substring 100 minus
/// a position penalty (floor 50); otherwise an in-order character match
/// with consecutive bonuses and gap penalties (floor 10); 0 when some
/// query character never appears.
pub fn fuzzy_match_score(query: &str, name: &str) -> i32 {
    if query.is_empty() {
        return 0;
    }
    let query = query.to_lowercase();
    let name_lower = name.to_lowercase();

    if name_lower == query {
        return 1000;
    }
    if name_lower.starts_with(&query) {
        return 500 + ((query.len() as f64 / name.len() as f64) * 100.0) as i32;
    }
    if let Some(pos) = name_lower.find(&query) {
        let penalty = ((pos * 10) as i32).min(50);
        return 100 - penalty;
    }

    // In-order character chain
    let mut score = 50;
    let mut prev_end: Option<usize> = None;
    let mut search_from = 0;
    for ch in query.chars() {
        match name_lower[search_from..].find(ch) {
            Some(offset) => {
                let at = search_from + offset;
                if let Some(end) = prev_end {
                    if at == end {
                        score += 20;
                    } else {
                        score -= (at - end) as i32;
                    }
                }
                prev_end = Some(at + ch.len_utf8());
                search_from = at + ch.len_utf8();
            }
            None => return 0,
        }
    }

    score.max(10)
}

/// One row of the scored project list delivered with `char`/`backspace`
/// mode notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProject {
    pub name: String,
    pub display_name: String,
    pub icon: String,
    pub score: i32,
}

/// Score and rank all projects for a query. Each project is matched
/// against its name (primary) and display name (secondary), keeping the
/// better score. An empty query keeps the input order with zero scores;
/// otherwise non-matching projects are dropped and the rest sorted by
/// descending score, name as tiebreak.
pub fn filter_projects(
    projects: &[(String, String, String)],
    query: &str,
) -> Vec<ScoredProject> {
    let mut rows: Vec<ScoredProject> = projects
        .iter()
        .map(|(name, display_name, icon)| {
            let name_score = fuzzy_match_score(query, name);
            let display_score = fuzzy_match_score(query, display_name);
            ScoredProject {
                name: name.clone(),
                display_name: display_name.clone(),
                icon: icon.clone(),
                score: name_score.max(display_score),
            }
        })
        .collect();

    if query.is_empty() {
        return rows;
    }

    rows.retain(|p| p.score > 0);
    rows.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// A recorded workspace switch for mode history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSwitch {
    pub workspace: u32,
    pub output: String,
    pub mode_type: ModeType,
    pub timestamp_ms: u64,
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
