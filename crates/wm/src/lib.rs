// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! i3pm-wm: window-manager adapter.
//!
//! Speaks the i3/Sway IPC protocol over the user's session socket:
//! discovery, resilient connection with event demultiplexing, typed tree
//! and reply models, and the `/proc` + `xprop` capabilities the identity
//! resolver builds on.

pub mod commander;
pub mod conn;
pub mod events;
pub mod ipc;
pub mod node;
pub mod pid;
pub mod procenv;
pub mod socket;

pub use commander::WmCommander;
#[cfg(any(test, feature = "test-support"))]
pub use commander::MockWm;
pub use conn::{EventStream, SocketHealth, WmConnection, WmError};
pub use events::{
    BindingEvent, BindingInfo, EventClass, ModeEvent, OutputEvent, ShutdownEvent, TickEvent,
    WindowEvent, WmEvent, WorkspaceEvent,
};
pub use ipc::ProtocolError;
pub use node::{CommandOutcome, Node, OutputInfo, Rect, VersionInfo, WindowProperties, WorkspaceInfo};
pub use pid::{NoPidProbe, PidProbe, XpropPidProbe};
pub use procenv::{parse_environ, read_i3pm_env, I3pmEnv};
pub use socket::{discover_socket, runtime_dir, scan_runtime_dir, socket_from_env};
