// SPDX-License-Identifier: MIT

//! i3pm daemon library.
//!
//! Exposes the RPC protocol and listener plumbing for CLI clients and
//! the two daemon binaries.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod lifecycle;
pub mod listener;
pub mod protocol;
pub mod router;
pub mod service;
pub mod tree_router;
pub mod tree_service;
pub mod watcher;
pub mod wm_handle;

pub use listener::{Broadcaster, ClientHandle, Listener, RpcService};
pub use protocol::{
    error_line, notification_line, parse_request, response_line, RpcError, RpcRequest,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
    PARSE_ERROR,
};
pub use router::{ConfigPaths, Router, RouterFlow};
pub use service::ProjectService;
pub use tree_router::{TreeRouter, TreeSource, TreeStats};
pub use tree_service::TreeService;
pub use wm_handle::WmHandle;
