// SPDX-License-Identifier: MIT

//! Window identity resolution.
//!
//! Derives `(app, project, scope, context)` for a window from, in order:
//! the process's `I3PM_*` environment, a title-based override for classes
//! that multiplex one process across projects, and class classification.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use i3pm_core::{build_context_mark, build_mark, Classification, Scope};
use i3pm_wm::{I3pmEnv, Node, PidProbe};

use crate::snapshot::EnvReader;

/// Resolved identity for one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub app: String,
    pub project: Option<String>,
    pub scope: Scope,
    pub context_key: Option<String>,
    /// Where the identity came from: `environment`, `title`, or
    /// `classification`.
    pub source: &'static str,
}

impl Identity {
    /// Canonical project mark, when the window is project-associated.
    pub fn mark(&self, con_id: i64) -> Option<String> {
        self.project
            .as_deref()
            .map(|project| build_mark(self.scope, &self.app, project, con_id))
    }

    pub fn context_mark(&self) -> Option<String> {
        self.context_key.as_deref().map(build_context_mark)
    }
}

/// Identity resolver with pluggable PID probing and environ reading.
pub struct IdentityResolver {
    env_reader: Arc<dyn EnvReader>,
    pid_probe: Arc<dyn PidProbe>,
    /// Classes whose titles override the environment-derived project.
    pub title_override_classes: BTreeSet<String>,
}

impl IdentityResolver {
    pub fn new(env_reader: Arc<dyn EnvReader>, pid_probe: Arc<dyn PidProbe>) -> Self {
        let mut title_override_classes = BTreeSet::new();
        title_override_classes.insert("Code".to_string());
        Self {
            env_reader,
            pid_probe,
            title_override_classes,
        }
    }

    /// Read the window's I3PM environment, probing for the PID when the
    /// WM does not expose one.
    pub async fn window_env(&self, window: &Node) -> I3pmEnv {
        let pid = match window.pid {
            Some(pid) => Some(pid),
            None => match window.window {
                Some(surface_id) => self.pid_probe.probe(surface_id).await,
                None => None,
            },
        };
        match pid {
            Some(pid) => self.env_reader.read(pid),
            None => I3pmEnv::default(),
        }
    }

    /// Resolve identity for a window against known projects and the
    /// classification state.
    pub async fn resolve(
        &self,
        window: &Node,
        known_projects: &BTreeSet<String>,
        classification: &Classification,
    ) -> Identity {
        let class = window.window_class().to_string();
        let env = self.window_env(window).await;

        if let (Some(project), Some(app)) = (env.project_name(), env.app_name()) {
            let scope = env
                .scope()
                .and_then(Scope::parse)
                .unwrap_or(Scope::Scoped);
            let mut project = project.to_string();
            let mut source = "environment";

            // One process can serve several projects; trust the title for
            // classes known to do that.
            if self.title_override_classes.contains(&class) {
                if let Some(title_project) =
                    title_project_override(window.name.as_deref().unwrap_or(""), known_projects)
                {
                    if title_project != project {
                        info!(
                            con_id = window.id,
                            env_project = %project,
                            title_project = %title_project,
                            "title overrides environment project"
                        );
                        project = title_project;
                        source = "title";
                    }
                }
            }

            return Identity {
                app: app.to_string(),
                project: Some(project),
                scope,
                context_key: env.context_key().map(String::from),
                source,
            };
        }

        let scope = classification.classify(&class);
        debug!(con_id = window.id, class = %class, ?scope, "classified by class");
        Identity {
            app: class,
            project: None,
            scope,
            context_key: None,
            source: "classification",
        }
    }
}

/// Parse a `(?:Code - )?<project> - …` title and return the project when
/// it names a known one (compared lowercase).
pub fn title_project_override(title: &str, known_projects: &BTreeSet<String>) -> Option<String> {
    let rest = title.strip_prefix("Code - ").unwrap_or(title);
    let (candidate, _) = rest.split_once('-')?;
    let candidate = candidate.trim().to_lowercase();
    if candidate.is_empty() {
        return None;
    }
    known_projects
        .iter()
        .find(|p| p.to_lowercase() == candidate)
        .cloned()
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
