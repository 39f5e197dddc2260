// SPDX-License-Identifier: MIT

//! Window-class classification: scoped/global sets plus ordered pattern
//! rules.
//!
//! Patterns come in three forms: `glob:PATTERN` (shell glob), `regex:PATTERN`
//! (anchored), and `literal:TEXT` (exact). Highest priority wins; ties keep
//! input order. Classes matching nothing default to scoped so an unknown
//! app can never leak across projects.

use std::collections::BTreeSet;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::window::Scope;

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("classes in both scoped and global sets: {0:?}")]
    OverlappingSets(Vec<String>),
}

#[derive(Debug, Clone)]
enum Matcher {
    Glob(glob::Pattern),
    Regex(regex::Regex),
    Literal(String),
}

/// One ordered classification pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawPattern", into = "RawPattern")]
pub struct PatternRule {
    pub pattern: String,
    pub scope: Scope,
    pub priority: i32,
    pub description: Option<String>,
    matcher: Matcher,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPattern {
    pattern: String,
    scope: Scope,
    #[serde(default)]
    priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl TryFrom<RawPattern> for PatternRule {
    type Error = ClassificationError;

    fn try_from(raw: RawPattern) -> Result<Self, Self::Error> {
        PatternRule::compile(&raw.pattern, raw.scope, raw.priority, raw.description)
    }
}

impl From<PatternRule> for RawPattern {
    fn from(rule: PatternRule) -> Self {
        RawPattern {
            pattern: rule.pattern,
            scope: rule.scope,
            priority: rule.priority,
            description: rule.description,
        }
    }
}

impl PatternRule {
    pub fn compile(
        pattern: &str,
        scope: Scope,
        priority: i32,
        description: Option<String>,
    ) -> Result<Self, ClassificationError> {
        let invalid = |reason: String| ClassificationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let matcher = if let Some(body) = pattern.strip_prefix("glob:") {
            Matcher::Glob(glob::Pattern::new(body).map_err(|e| invalid(e.to_string()))?)
        } else if let Some(body) = pattern.strip_prefix("regex:") {
            // Anchor so `regex:Code` does not match "vscode"
            let re = regex::Regex::new(&format!("^(?:{body})$")).map_err(|e| invalid(e.to_string()))?;
            Matcher::Regex(re)
        } else if let Some(body) = pattern.strip_prefix("literal:") {
            Matcher::Literal(body.to_string())
        } else {
            return Err(invalid("expected glob:, regex:, or literal: prefix".to_string()));
        };

        Ok(Self {
            pattern: pattern.to_string(),
            scope,
            priority,
            description,
            matcher,
        })
    }

    pub fn matches(&self, class: &str) -> bool {
        match &self.matcher {
            Matcher::Glob(p) => p.matches(class),
            Matcher::Regex(r) => r.is_match(class),
            Matcher::Literal(s) => s == class,
        }
    }
}

/// Classification state loaded from `app-classes.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub scoped_classes: BTreeSet<String>,
    #[serde(default)]
    pub global_classes: BTreeSet<String>,
    #[serde(default, deserialize_with = "deserialize_patterns")]
    pub class_patterns: Vec<PatternRule>,
}

/// Accepts the current array form and the legacy `{pattern: scope}` object
/// form. Legacy entries get priority 0 and a deterministic, name-sorted
/// order (the object form has no inherent ordering).
fn deserialize_patterns<'de, D>(deserializer: D) -> Result<Vec<PatternRule>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PatternsForm {
        List(Vec<RawPattern>),
        Legacy(std::collections::BTreeMap<String, Scope>),
    }

    let rules: Vec<RawPattern> = match PatternsForm::deserialize(deserializer)? {
        PatternsForm::List(list) => list,
        PatternsForm::Legacy(map) => map
            .into_iter()
            .map(|(pattern, scope)| RawPattern {
                pattern,
                scope,
                priority: 0,
                description: None,
            })
            .collect(),
    };

    rules
        .into_iter()
        .map(|raw| PatternRule::try_from(raw).map_err(D::Error::custom))
        .collect()
}

impl Classification {
    /// Validate invariants and order patterns by descending priority.
    ///
    /// Stable sort: equal priorities keep their input order.
    pub fn finalize(mut self) -> Result<Self, ClassificationError> {
        let overlap: Vec<String> = self
            .scoped_classes
            .intersection(&self.global_classes)
            .cloned()
            .collect();
        if !overlap.is_empty() {
            return Err(ClassificationError::OverlappingSets(overlap));
        }

        self.class_patterns.sort_by_key(|p| std::cmp::Reverse(p.priority));
        Ok(self)
    }

    /// Classify a window class. Explicit sets win over patterns; no match
    /// defaults to scoped.
    pub fn classify(&self, class: &str) -> Scope {
        if self.scoped_classes.contains(class) {
            return Scope::Scoped;
        }
        if self.global_classes.contains(class) {
            return Scope::Global;
        }
        self.class_patterns
            .iter()
            .find(|p| p.matches(class))
            .map(|p| p.scope)
            .unwrap_or(Scope::Scoped)
    }

    /// Like [`classify`], but `None` when nothing matched (for callers that
    /// distinguish "explicitly scoped" from "defaulted").
    pub fn classify_exact(&self, class: &str) -> Option<Scope> {
        if self.scoped_classes.contains(class) {
            return Some(Scope::Scoped);
        }
        if self.global_classes.contains(class) {
            return Some(Scope::Global);
        }
        self.class_patterns
            .iter()
            .find(|p| p.matches(class))
            .map(|p| p.scope)
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
