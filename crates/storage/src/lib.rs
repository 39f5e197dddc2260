// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer: materialized state, workspace tracking, and the small
//! persisted JSON files.

pub mod config;
mod files;
pub mod persist;
mod state;
mod tracker;

pub use config::{
    load_classification, load_output_states, load_project_configs, load_window_rules, ConfigError,
};
pub use files::{load_json, save_json, StorageError};
pub use persist::{
    load_active_project, load_focus_state, save_active_project, save_focus_state,
};
pub use state::{FocusState, StateStats, StateStore};
pub use tracker::{
    Geometry, TrackedWindow, WorkspaceTracker, DEFAULT_MAX_AGE_DAYS, SCHEMA_VERSION,
    SCRATCHPAD_WORKSPACE,
};
