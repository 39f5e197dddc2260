// SPDX-License-Identifier: MIT

//! Decoded WM event payloads.

use serde::{Deserialize, Serialize};

use crate::ipc::{
    Message, ProtocolError, EVENT_BINDING, EVENT_MODE, EVENT_OUTPUT, EVENT_SHUTDOWN, EVENT_TICK,
    EVENT_WINDOW, EVENT_WORKSPACE,
};
use crate::node::Node;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WindowEvent {
    pub change: String,
    pub container: Node,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkspaceEvent {
    pub change: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputEvent {
    #[serde(default)]
    pub change: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModeEvent {
    pub change: String,
    #[serde(default)]
    pub pango_markup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BindingInfo {
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default)]
    pub input_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BindingEvent {
    pub change: String,
    pub binding: BindingInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ShutdownEvent {
    pub change: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TickEvent {
    #[serde(default)]
    pub first: bool,
    #[serde(default)]
    pub payload: String,
}

/// One decoded event off the subscription stream.
#[derive(Debug, Clone, PartialEq)]
pub enum WmEvent {
    Window(WindowEvent),
    Workspace(WorkspaceEvent),
    Output(OutputEvent),
    Mode(ModeEvent),
    Binding(BindingEvent),
    Shutdown(ShutdownEvent),
    Tick(TickEvent),
}

impl WmEvent {
    /// Decode a raw event message. Returns `None` for event classes the
    /// daemons never subscribe to.
    pub fn decode(msg: &Message) -> Result<Option<Self>, ProtocolError> {
        if !msg.is_event() {
            return Ok(None);
        }
        let event = match msg.event_code() {
            EVENT_WINDOW => Some(WmEvent::Window(msg.decode()?)),
            EVENT_WORKSPACE => Some(WmEvent::Workspace(msg.decode()?)),
            EVENT_OUTPUT => Some(WmEvent::Output(msg.decode()?)),
            EVENT_MODE => Some(WmEvent::Mode(msg.decode()?)),
            EVENT_BINDING => Some(WmEvent::Binding(msg.decode()?)),
            EVENT_SHUTDOWN => Some(WmEvent::Shutdown(msg.decode()?)),
            EVENT_TICK => Some(WmEvent::Tick(msg.decode()?)),
            _ => None,
        };
        Ok(event)
    }
}

/// Event classes for `SUBSCRIBE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventClass {
    Window,
    Workspace,
    Output,
    Mode,
    Binding,
    Shutdown,
    Tick,
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
