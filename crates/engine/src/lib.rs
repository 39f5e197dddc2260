// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! i3pm-engine: the behavior layer shared by both daemons.
//!
//! Hashing, diffing, identity resolution, rules, project switching,
//! launch and action correlation, and the input-mode state machine.

pub mod causality;
pub mod differ;
pub mod filtering;
pub mod hash_cache;
pub mod hasher;
pub mod identity;
pub mod launch_registry;
pub mod mode_manager;
pub mod rules;
pub mod snapshot;
pub mod switcher;

pub use causality::{
    ActionCorrelator, CascadeChain, CascadeTracker, CorrelatorStats, ACTION_WINDOW_MS,
    MAX_ACTIONS, MAX_CASCADES, PRIMARY_THRESHOLD,
};
pub use differ::compute_diff;
pub use filtering::{
    build_batch_command, hide_windows_batch, restore_windows_batch, HideReport, RestoreReport,
    FALLBACK_WORKSPACE,
};
pub use hash_cache::{CacheStats, HashCache, CLEANUP_INTERVAL_MS, DEFAULT_MAX_AGE_MS};
pub use hasher::{content_hash, node_id, node_path, subtree_hash, tree_hash};
pub use identity::{title_project_override, Identity, IdentityResolver};
pub use launch_registry::{
    LaunchMatch, LaunchRegistry, LaunchRegistryError, LaunchStats, DEFAULT_LAUNCH_TTL_MS,
    MAX_PENDING,
};
pub use mode_manager::{
    ActiveMode, ExecuteResult, ModeError, ModeManager, ModeNotification, ModeSnapshot, ModeState,
    PendingWorkspace, HISTORY_LIMIT,
};
pub use rules::{execute_action, RuleEngine, ACTION_BUDGET_MS};
pub use snapshot::{capture_snapshot, enrich_tree, EnvReader, ProcEnvReader};
pub use switcher::{
    Launcher, ProcessLauncher, ProjectSwitcher, SwitchError, SwitchOutcome, SwitcherDeps,
    SWITCH_QUEUE_DEPTH,
};
