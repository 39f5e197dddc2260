// SPDX-License-Identifier: MIT

//! RPC method handlers for the window-project daemon.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::info;

use i3pm_core::{Event, EventRing, ModeType, Source};
use i3pm_engine::{LaunchRegistry, ModeManager, ProjectSwitcher};
use i3pm_storage::StateStore;
use i3pm_wm::SocketHealth;

use crate::listener::{Broadcaster, ClientHandle, RpcService};
use crate::protocol::RpcError;
use crate::router::Router;

/// Provider of the current WM socket health (None before first connect).
pub type HealthProvider = Arc<dyn Fn() -> Option<SocketHealth> + Send + Sync>;

pub struct ProjectService {
    pub state: Arc<Mutex<StateStore>>,
    pub ring: Arc<Mutex<EventRing>>,
    pub switcher: ProjectSwitcher,
    pub registry: Arc<Mutex<LaunchRegistry>>,
    pub mode: Arc<tokio::sync::Mutex<ModeManager>>,
    pub router: Arc<Router>,
    pub broadcaster: Broadcaster,
    pub health: HealthProvider,
    pub start_time: Instant,
}

#[async_trait]
impl RpcService for ProjectService {
    async fn handle(
        &self,
        method: &str,
        params: Option<&Value>,
        client: &ClientHandle,
    ) -> Result<Value, RpcError> {
        match method {
            "get_status" => self.get_status(),
            "get_active_project" => self.get_active_project(),
            "get_projects" => self.get_projects(),
            "get_windows" => self.get_windows(params),
            "switch_project" => self.switch_project(params).await,
            "get_events" => self.get_events(params),
            "subscribe_events" => subscribe_events(params, client),
            "list_monitors" => Ok(list_monitors(&self.broadcaster)),
            "reload_config" => self.reload_config(),
            "launch_notification" => self.launch_notification(params),
            "get_launch_stats" => Ok(json!(self.registry.lock().stats())),
            "mode_command" => self.mode_command(params).await,
            "get_mode_state" => self.get_mode_state().await,
            other => Err(RpcError::method_not_found(other)),
        }
    }
}

impl ProjectService {
    fn get_status(&self) -> Result<Value, RpcError> {
        let (stats, connected, active_project) = {
            let state = self.state.lock();
            (
                state.stats(),
                state.connected,
                state.active_project().map(String::from),
            )
        };

        Ok(json!({
            "status": "running",
            "connected": connected,
            "uptime_seconds": self.start_time.elapsed().as_secs(),
            "active_project": active_project,
            "window_count": stats.window_count,
            "workspace_count": stats.workspace_count,
            "event_count": stats.event_count,
            "error_count": stats.error_count,
            "socket_health": (self.health)(),
        }))
    }

    fn get_active_project(&self) -> Result<Value, RpcError> {
        let active = self.state.lock().active_project().map(String::from);
        Ok(json!({
            "project_name": active,
            "is_global": active.is_none(),
        }))
    }

    fn get_projects(&self) -> Result<Value, RpcError> {
        let state = self.state.lock();
        let active = state.active_project().map(String::from);
        let projects: Vec<Value> = state
            .projects
            .values()
            .map(|p| {
                json!({
                    "name": p.name,
                    "display_name": p.label(),
                    "icon": p.icon,
                    "directory": p.directory,
                    "window_count": state.window_count_of(&p.name),
                    "active": active.as_deref() == Some(p.name.as_str()),
                })
            })
            .collect();
        Ok(json!({"projects": projects}))
    }

    fn get_windows(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let project = params
            .and_then(|p| p.get("project"))
            .and_then(Value::as_str);

        let state = self.state.lock();
        let windows = match project {
            Some(project) => state.windows_by_project(project),
            None => state.windows(),
        };
        Ok(json!({"windows": windows}))
    }

    async fn switch_project(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        // null / absent project means global mode
        let target = params
            .and_then(|p| p.get("project"))
            .and_then(Value::as_str)
            .map(String::from);

        info!(project = ?target, "switch_project via RPC");
        let outcome = self
            .switcher
            .switch(target)
            .await
            .map_err(RpcError::internal)?;
        Ok(serde_json::to_value(outcome).map_err(RpcError::internal)?)
    }

    fn get_events(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let limit = params
            .and_then(|p| p.get("limit"))
            .and_then(Value::as_u64)
            .unwrap_or(100) as usize;
        let event_type = params
            .and_then(|p| p.get("event_type"))
            .and_then(Value::as_str)
            .map(String::from);
        let since_id = params.and_then(|p| p.get("since_id")).and_then(Value::as_u64);

        let entries = {
            let ring = self.ring.lock();
            ring.query(limit, event_type.as_deref(), since_id)
        };
        self.router.record_event(
            Event::IpcQuery {
                method: "get_events".to_string(),
            },
            Source::Ipc,
        );
        Ok(json!({"events": entries}))
    }

    fn reload_config(&self) -> Result<Value, RpcError> {
        self.router.reload_config();
        Ok(json!({"reloaded": true}))
    }

    fn launch_notification(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::invalid_params("missing params"))?;
        let app_name = params
            .get("app_name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("app_name required"))?;
        let expected_class = params
            .get("expected_class")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("expected_class required"))?;
        let project = params.get("project_name").and_then(Value::as_str);
        let workspace = params
            .get("workspace_number")
            .and_then(Value::as_i64)
            .map(|n| n as i32);

        let launch_id = self
            .registry
            .lock()
            .add(app_name, project, expected_class, workspace)
            .map_err(RpcError::internal)?;
        Ok(json!({"launch_id": launch_id}))
    }

    async fn mode_command(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::invalid_params("missing params"))?;
        let command = params
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("command required"))?;
        let value = params.get("value").and_then(Value::as_str).unwrap_or("");

        let mut mode = self.mode.lock().await;
        let result: Value = match command {
            "enter" => {
                let mode_type = match value {
                    "goto" => ModeType::Goto,
                    "move" => ModeType::Move,
                    "project" => ModeType::Project,
                    other => {
                        return Err(RpcError::invalid_params(format!("unknown mode: {other}")))
                    }
                };
                mode.enter(mode_type).await.map_err(RpcError::internal)?;
                Value::Null
            }
            "digit" => {
                let digit = value
                    .chars()
                    .next()
                    .ok_or_else(|| RpcError::invalid_params("digit required"))?;
                Value::String(mode.add_digit(digit).await.map_err(RpcError::internal)?)
            }
            "char" => {
                let ch = value
                    .chars()
                    .next()
                    .ok_or_else(|| RpcError::invalid_params("char required"))?;
                Value::String(mode.add_char(ch).map_err(RpcError::internal)?)
            }
            "backspace" => Value::String(mode.backspace().await.map_err(RpcError::internal)?),
            "execute" => {
                let result = mode.execute().await.map_err(RpcError::internal)?;
                serde_json::to_value(result).map_err(RpcError::internal)?
            }
            "cancel" => {
                mode.cancel().await.map_err(RpcError::internal)?;
                Value::Null
            }
            "nav" => {
                mode.nav(value).map_err(RpcError::internal)?;
                Value::Null
            }
            "delete" => {
                mode.delete().map_err(RpcError::internal)?;
                Value::Null
            }
            "action" => {
                mode.window_action(value).map_err(RpcError::internal)?;
                Value::Null
            }
            other => return Err(RpcError::invalid_params(format!("unknown command: {other}"))),
        };

        Ok(json!({"state": mode.snapshot(), "result": result}))
    }

    async fn get_mode_state(&self) -> Result<Value, RpcError> {
        let mode = self.mode.lock().await;
        Ok(json!({
            "state": mode.snapshot(),
            "history": mode.history(10),
        }))
    }
}

/// Shared `subscribe_events` handling.
pub fn subscribe_events(
    params: Option<&Value>,
    client: &ClientHandle,
) -> Result<Value, RpcError> {
    let enable = params
        .and_then(|p| p.get("enable"))
        .and_then(Value::as_bool)
        .unwrap_or(true);
    client.set_subscribed(enable);
    Ok(json!({"subscribed": enable}))
}

/// Shared `list_monitors` handling.
pub fn list_monitors(broadcaster: &Broadcaster) -> Value {
    let clients: Vec<Value> = broadcaster
        .client_list()
        .into_iter()
        .map(|(client_id, subscribed)| json!({"client_id": client_id, "subscribed": subscribed}))
        .collect();
    json!({"clients": clients})
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
