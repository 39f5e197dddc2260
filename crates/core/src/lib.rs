// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! i3pm-core: domain types shared by the window-project and tree-diff
//! daemons.

pub mod causality;
pub mod classify;
pub mod clock;
pub mod diff;
pub mod event;
pub mod launch;
pub mod mode;
pub mod outputs;
pub mod project;
pub mod ring;
pub mod rules;
pub mod window;

pub use causality::{
    calculate_confidence, ActionType, ConfidenceLevel, EventCorrelation, FactorBreakdown,
    UserAction, CORRELATION_WINDOW_MS,
};
pub use classify::{Classification, ClassificationError, PatternRule};
pub use clock::{Clock, FakeClock, SystemClock};
pub use diff::{
    field_significance, ChangeType, EnrichedWindow, FieldChange, NodeChange, NodeFingerprint,
    TreeDiff, TreeSnapshot, VOLATILE_FIELDS,
};
pub use event::{Event, Source};
pub use launch::{
    launch_confidence, CorrelationSignals, LaunchCorrelation, PendingLaunch, MATCH_THRESHOLD,
};
pub use mode::{
    filter_projects, fuzzy_match_project, fuzzy_match_score, parse_workspace_digits, InputType,
    ModeType, ScoredProject, WorkspaceSwitch, WorkspaceTarget, MAX_WORKSPACE,
};
pub use outputs::{role_for_workspace, OutputRole, OutputRoles, FALLBACK_OUTPUT};
pub use project::{ActiveProject, LaunchSpec, ProjectConfig};
pub use ring::{EventRing, RingEntry, RingStats, DEFAULT_RING_CAPACITY};
pub use rules::{ActionOutcome, LayoutMode, MatchCriteria, RuleAction, RuleError, WindowRule};
pub use window::{
    build_context_mark, build_mark, is_project_mark, parse_legacy_mark, ParsedMark, Scope,
    WindowRecord,
};
