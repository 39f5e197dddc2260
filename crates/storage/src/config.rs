// SPDX-License-Identifier: MIT

//! Configuration file loading.
//!
//! All formats are JSON written by external tooling: per-project files in
//! `projects/`, the classification file, the ordered window-rules list,
//! and per-output enabled flags. Loaders are tolerant: one bad project
//! file is skipped with a warning rather than failing the whole load.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use i3pm_core::{Classification, ClassificationError, ProjectConfig, WindowRule};

use crate::files::StorageError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Load every `*.json` project file in a directory, keyed by project name.
///
/// Unparseable files are skipped with a warning.
pub fn load_project_configs(dir: &Path) -> BTreeMap<String, ProjectConfig> {
    let mut projects = BTreeMap::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return projects,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match parse_file::<ProjectConfig>(&path) {
            Ok(config) => {
                projects.insert(config.name.clone(), config);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping bad project file"),
        }
    }

    projects
}

/// Load and validate `app-classes.json`.
///
/// A missing file yields the empty classification (everything defaults to
/// scoped); overlap between the scoped and global sets is a hard error.
pub fn load_classification(path: &Path) -> Result<Classification, ConfigError> {
    if !path.exists() {
        return Ok(Classification::default());
    }
    let raw: Classification = parse_file(path)?;
    Ok(raw.finalize()?)
}

/// Load the ordered rule list from `window-rules.json`.
pub fn load_window_rules(path: &Path) -> Result<Vec<WindowRule>, ConfigError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    parse_file(path)
}

/// Load `output-states.json`: output name → enabled flag.
pub fn load_output_states(path: &Path) -> Result<BTreeMap<String, bool>, ConfigError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    parse_file(path)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
