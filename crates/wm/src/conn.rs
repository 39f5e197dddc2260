// SPDX-License-Identifier: MIT

//! Resilient WM IPC session.
//!
//! One Unix-socket connection carries both command replies and the event
//! subscription. A reader task demultiplexes incoming messages: events go
//! to the event channel, replies resolve the oldest pending request
//! (replies arrive in request order on an i3 IPC socket).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::events::{EventClass, WmEvent};
use crate::ipc::{self, Message, ProtocolError};
use crate::node::{CommandOutcome, Node, OutputInfo, VersionInfo, WorkspaceInfo};
use crate::socket;

/// Initial reconnect backoff.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Backoff ceiling.
pub const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Health-check timeout for `get_tree` probes.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum WmError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection lost")]
    Disconnected,

    #[error("no WM socket found")]
    NoSocket,

    #[error("failed to connect after {attempts} attempts")]
    ConnectFailed { attempts: u32 },

    #[error("subscribe rejected by WM")]
    SubscribeFailed,

    #[error("WM query timed out")]
    Timeout,
}

/// Socket health for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocketHealth {
    /// `healthy`, `stale`, or `disconnected`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_validated_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    pub reconnection_count: u32,
    pub uptime_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct ConnStats {
    reconnection_count: u32,
    connected_at: Option<std::time::Instant>,
    last_validated_ms: Option<u64>,
    last_latency_ms: Option<f64>,
}

struct ConnInner {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: StdMutex<VecDeque<oneshot::Sender<Message>>>,
}

/// Stream of decoded WM events.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<WmEvent>,
}

impl EventStream {
    /// Next event; `None` when the connection is gone.
    pub async fn next(&mut self) -> Option<WmEvent> {
        self.rx.recv().await
    }
}

/// An open session to the window manager.
pub struct WmConnection {
    inner: Arc<ConnInner>,
    socket_path: PathBuf,
    stats: StdMutex<ConnStats>,
}

impl WmConnection {
    /// Connect to a specific socket path.
    pub async fn connect(path: &Path) -> Result<(Self, EventStream), WmError> {
        let stream = UnixStream::connect(path).await?;
        let (read_half, write_half) = stream.into_split();

        let inner = Arc::new(ConnInner {
            writer: tokio::sync::Mutex::new(write_half),
            pending: StdMutex::new(VecDeque::new()),
        });

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(reader_loop(read_half, Arc::clone(&inner), event_tx));

        let conn = Self {
            inner,
            socket_path: path.to_path_buf(),
            stats: StdMutex::new(ConnStats {
                connected_at: Some(std::time::Instant::now()),
                ..ConnStats::default()
            }),
        };

        Ok((conn, EventStream { rx: event_rx }))
    }

    /// Discover the socket and connect with exponential backoff.
    ///
    /// Backoff starts at 100 ms and doubles to a 5 s cap. The connection
    /// is probed with `get_version` before being handed back.
    pub async fn connect_with_retry(max_attempts: u32) -> Result<(Self, EventStream), WmError> {
        let mut delay = INITIAL_BACKOFF;

        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, "connecting to WM");

            match Self::try_connect_once().await {
                Ok((conn, events)) => {
                    let version = conn.get_version().await?;
                    info!(version = %version.human_readable, "connected to WM");
                    return Ok((conn, events));
                }
                Err(e) => {
                    warn!(attempt, error = %e, "WM connection attempt failed");
                    if attempt < max_attempts {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(MAX_BACKOFF);
                    }
                }
            }
        }

        Err(WmError::ConnectFailed {
            attempts: max_attempts,
        })
    }

    async fn try_connect_once() -> Result<(Self, EventStream), WmError> {
        let path = socket::discover_socket().ok_or(WmError::NoSocket)?;
        Self::connect(&path).await
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Record that this session replaced a previous one.
    pub fn mark_reconnected(&self, previous_reconnects: u32) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.reconnection_count = previous_reconnects + 1;
    }

    pub fn reconnection_count(&self) -> u32 {
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.reconnection_count
    }

    /// Issue one request and await its reply.
    async fn request(&self, msg_type: u32, payload: &[u8]) -> Result<Message, WmError> {
        let (tx, rx) = oneshot::channel();

        {
            let mut writer = self.inner.writer.lock().await;
            {
                let mut pending = self
                    .inner
                    .pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                pending.push_back(tx);
            }
            if let Err(e) = ipc::write_message(&mut *writer, msg_type, payload).await {
                let mut pending = self
                    .inner
                    .pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                pending.pop_back();
                return Err(e.into());
            }
        }

        rx.await.map_err(|_| WmError::Disconnected)
    }

    /// Enable event delivery for the given classes.
    ///
    /// Must complete before the main loop starts consuming events so
    /// nothing early is lost.
    pub async fn subscribe(&self, classes: &[EventClass]) -> Result<(), WmError> {
        let payload = serde_json::to_vec(classes).map_err(ProtocolError::from)?;
        let reply = self.request(ipc::SUBSCRIBE, &payload).await?;
        let value: serde_json::Value = reply.decode()?;
        if value.get("success").and_then(|v| v.as_bool()) == Some(true) {
            debug!(?classes, "subscribed to WM events");
            Ok(())
        } else {
            Err(WmError::SubscribeFailed)
        }
    }

    pub async fn run_command(&self, command: &str) -> Result<Vec<CommandOutcome>, WmError> {
        let reply = self.request(ipc::RUN_COMMAND, command.as_bytes()).await?;
        Ok(reply.decode()?)
    }

    pub async fn get_tree(&self) -> Result<Node, WmError> {
        let reply = self.request(ipc::GET_TREE, b"").await?;
        Ok(reply.decode()?)
    }

    /// Raw JSON tree for the diff engine.
    pub async fn get_tree_raw(&self) -> Result<serde_json::Value, WmError> {
        let reply = self.request(ipc::GET_TREE, b"").await?;
        Ok(reply.decode()?)
    }

    pub async fn get_workspaces(&self) -> Result<Vec<WorkspaceInfo>, WmError> {
        let reply = self.request(ipc::GET_WORKSPACES, b"").await?;
        Ok(reply.decode()?)
    }

    pub async fn get_outputs(&self) -> Result<Vec<OutputInfo>, WmError> {
        let reply = self.request(ipc::GET_OUTPUTS, b"").await?;
        Ok(reply.decode()?)
    }

    pub async fn get_marks(&self) -> Result<Vec<String>, WmError> {
        let reply = self.request(ipc::GET_MARKS, b"").await?;
        Ok(reply.decode()?)
    }

    pub async fn get_version(&self) -> Result<VersionInfo, WmError> {
        let reply = self.request(ipc::GET_VERSION, b"").await?;
        Ok(reply.decode()?)
    }

    pub async fn send_tick(&self, payload: &str) -> Result<(), WmError> {
        self.request(ipc::SEND_TICK, payload.as_bytes()).await?;
        Ok(())
    }

    /// Health probe: `get_tree` under a short timeout. `get_version` is
    /// known to succeed against stale sockets, so the heavier query is
    /// deliberate.
    pub async fn validate(&self, now_ms: u64) -> Result<f64, WmError> {
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, self.get_tree()).await;
        match result {
            Ok(Ok(_)) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
                stats.last_validated_ms = Some(now_ms);
                stats.last_latency_ms = Some(latency_ms);
                Ok(latency_ms)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(WmError::Timeout),
        }
    }

    /// Whether the socket file this session was opened on still exists
    /// and matches current discovery.
    pub fn socket_is_current(&self) -> bool {
        if !self.socket_path.exists() {
            return false;
        }
        match socket::discover_socket() {
            Some(discovered) => discovered == self.socket_path,
            None => false,
        }
    }

    pub fn health(&self, connected: bool) -> SocketHealth {
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        let uptime_seconds = stats
            .connected_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        let (status, error) = if !connected {
            ("disconnected", Some("no active WM IPC connection".to_string()))
        } else if !self.socket_path.exists() {
            ("stale", Some("socket file does not exist".to_string()))
        } else {
            ("healthy", None)
        };

        SocketHealth {
            status: status.to_string(),
            socket_path: Some(self.socket_path.display().to_string()),
            last_validated_ms: stats.last_validated_ms,
            latency_ms: stats.last_latency_ms,
            reconnection_count: stats.reconnection_count,
            uptime_seconds,
            error,
        }
    }
}

async fn reader_loop(
    mut read_half: tokio::net::unix::OwnedReadHalf,
    inner: Arc<ConnInner>,
    event_tx: mpsc::UnboundedSender<WmEvent>,
) {
    loop {
        match ipc::read_message(&mut read_half).await {
            Ok(msg) if msg.is_event() => match WmEvent::decode(&msg) {
                Ok(Some(event)) => {
                    if event_tx.send(event).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, code = msg.event_code(), "undecodable WM event"),
            },
            Ok(msg) => {
                let sender = {
                    let mut pending = inner.pending.lock().unwrap_or_else(|e| e.into_inner());
                    pending.pop_front()
                };
                match sender {
                    Some(tx) => {
                        let _ = tx.send(msg);
                    }
                    None => warn!(msg_type = msg.msg_type, "reply with no pending request"),
                }
            }
            Err(ProtocolError::ConnectionClosed) => {
                debug!("WM socket closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "WM read error, dropping connection");
                break;
            }
        }
    }

    // Dropping pending senders resolves outstanding requests as Disconnected
    let mut pending = inner.pending.lock().unwrap_or_else(|e| e.into_inner());
    pending.clear();
}

#[cfg(test)]
#[path = "conn_tests.rs"]
mod tests;
