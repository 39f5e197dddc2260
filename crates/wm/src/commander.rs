// SPDX-License-Identifier: MIT

//! Command seam between the engine and the window manager.
//!
//! Engine components (rule engine, switch coordinator, mode manager) talk
//! to the WM only through this trait so they can run against a recording
//! mock in tests.

use async_trait::async_trait;

use crate::conn::{WmConnection, WmError};
use crate::node::{CommandOutcome, Node, OutputInfo, WorkspaceInfo};

#[async_trait]
pub trait WmCommander: Send + Sync {
    async fn run_command(&self, command: &str) -> Result<Vec<CommandOutcome>, WmError>;
    async fn get_tree(&self) -> Result<Node, WmError>;
    async fn get_workspaces(&self) -> Result<Vec<WorkspaceInfo>, WmError>;
    async fn get_outputs(&self) -> Result<Vec<OutputInfo>, WmError>;
    async fn get_marks(&self) -> Result<Vec<String>, WmError>;
}

#[async_trait]
impl WmCommander for WmConnection {
    async fn run_command(&self, command: &str) -> Result<Vec<CommandOutcome>, WmError> {
        WmConnection::run_command(self, command).await
    }

    async fn get_tree(&self) -> Result<Node, WmError> {
        WmConnection::get_tree(self).await
    }

    async fn get_workspaces(&self) -> Result<Vec<WorkspaceInfo>, WmError> {
        WmConnection::get_workspaces(self).await
    }

    async fn get_outputs(&self) -> Result<Vec<OutputInfo>, WmError> {
        WmConnection::get_outputs(self).await
    }

    async fn get_marks(&self) -> Result<Vec<String>, WmError> {
        WmConnection::get_marks(self).await
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use mock::MockWm;

#[cfg(any(test, feature = "test-support"))]
mod mock {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    /// Recording fake: captures every command, answers queries from
    /// canned data, and can be told to fail matching sub-commands.
    #[derive(Clone, Default)]
    pub struct MockWm {
        state: Arc<StdMutex<MockState>>,
    }

    #[derive(Default)]
    struct MockState {
        commands: Vec<String>,
        tree: Node,
        workspaces: Vec<WorkspaceInfo>,
        outputs: Vec<OutputInfo>,
        marks: Vec<String>,
        fail_matching: Vec<String>,
    }

    impl MockWm {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_tree(&self, tree: Node) {
            self.lock().tree = tree;
        }

        pub fn set_workspaces(&self, workspaces: Vec<WorkspaceInfo>) {
            self.lock().workspaces = workspaces;
        }

        pub fn set_outputs(&self, outputs: Vec<OutputInfo>) {
            self.lock().outputs = outputs;
        }

        pub fn set_marks(&self, marks: Vec<String>) {
            self.lock().marks = marks;
        }

        /// Sub-commands containing this fragment will report failure.
        pub fn fail_commands_matching(&self, fragment: &str) {
            self.lock().fail_matching.push(fragment.to_string());
        }

        /// Every command issued so far, in order.
        pub fn commands(&self) -> Vec<String> {
            self.lock().commands.clone()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    #[async_trait]
    impl WmCommander for MockWm {
        async fn run_command(&self, command: &str) -> Result<Vec<CommandOutcome>, WmError> {
            let mut state = self.lock();
            state.commands.push(command.to_string());

            let outcomes = command
                .split(';')
                .map(|sub| {
                    let failed = state.fail_matching.iter().any(|f| sub.contains(f.as_str()));
                    CommandOutcome {
                        success: !failed,
                        error: failed.then(|| "mock failure".to_string()),
                    }
                })
                .collect();
            Ok(outcomes)
        }

        async fn get_tree(&self) -> Result<Node, WmError> {
            Ok(self.lock().tree.clone())
        }

        async fn get_workspaces(&self) -> Result<Vec<WorkspaceInfo>, WmError> {
            Ok(self.lock().workspaces.clone())
        }

        async fn get_outputs(&self) -> Result<Vec<OutputInfo>, WmError> {
            Ok(self.lock().outputs.clone())
        }

        async fn get_marks(&self) -> Result<Vec<String>, WmError> {
            Ok(self.lock().marks.clone())
        }
    }
}
