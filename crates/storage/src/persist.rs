// SPDX-License-Identifier: MIT

//! Small persisted state files: active project and focus memory.

use std::path::Path;

use chrono::Utc;

use i3pm_core::ActiveProject;

use crate::files::{self, StorageError};
use crate::state::FocusState;

/// Load `active-project.json`; absent or corrupt files mean global mode.
pub fn load_active_project(path: &Path) -> Result<ActiveProject, StorageError> {
    Ok(files::load_json(path)?.unwrap_or_default())
}

/// Persist an active-project transition.
pub fn save_active_project(
    path: &Path,
    current: Option<&str>,
    previous: Option<&str>,
) -> Result<(), StorageError> {
    let state = ActiveProject {
        project_name: current.map(String::from),
        previous_project: previous.map(String::from),
        activated_at: Some(Utc::now()),
    };
    files::save_json(path, &state)
}

pub fn load_focus_state(path: &Path) -> Result<FocusState, StorageError> {
    Ok(files::load_json(path)?.unwrap_or_default())
}

pub fn save_focus_state(path: &Path, focus: &FocusState) -> Result<(), StorageError> {
    files::save_json(path, focus)
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
