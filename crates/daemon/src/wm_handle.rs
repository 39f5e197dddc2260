// SPDX-License-Identifier: MIT

//! Swappable handle to the current WM connection.
//!
//! Engine components hold this handle; when the router reconnects after
//! a Sway restart it swaps the inner connection and every holder follows
//! automatically.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use i3pm_wm::{CommandOutcome, Node, OutputInfo, WmCommander, WmConnection, WmError, WorkspaceInfo};

#[derive(Clone)]
pub struct WmHandle {
    inner: Arc<Mutex<Arc<WmConnection>>>,
}

impl WmHandle {
    pub fn new(conn: Arc<WmConnection>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conn)),
        }
    }

    /// The connection currently in service.
    pub fn current(&self) -> Arc<WmConnection> {
        Arc::clone(&self.inner.lock())
    }

    /// Swap in a replacement connection after reconnect.
    pub fn replace(&self, conn: Arc<WmConnection>) {
        *self.inner.lock() = conn;
    }
}

#[async_trait]
impl WmCommander for WmHandle {
    async fn run_command(&self, command: &str) -> Result<Vec<CommandOutcome>, WmError> {
        self.current().run_command(command).await
    }

    async fn get_tree(&self) -> Result<Node, WmError> {
        self.current().get_tree().await
    }

    async fn get_workspaces(&self) -> Result<Vec<WorkspaceInfo>, WmError> {
        self.current().get_workspaces().await
    }

    async fn get_outputs(&self) -> Result<Vec<OutputInfo>, WmError> {
        self.current().get_outputs().await
    }

    async fn get_marks(&self) -> Result<Vec<String>, WmError> {
        self.current().get_marks().await
    }
}
