// SPDX-License-Identifier: MIT

//! Listener task for the local RPC socket.
//!
//! Each connection gets a reader loop and a writer task; responses and
//! notifications share the writer channel so per-connection ordering
//! holds. The broadcaster fans ring entries and mode notifications out
//! to subscribed clients; a broken writer just drops out of the set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use i3pm_core::RingEntry;

use crate::protocol::{self, RpcError};

/// Method dispatch implemented by each daemon flavor.
#[async_trait]
pub trait RpcService: Send + Sync + 'static {
    async fn handle(
        &self,
        method: &str,
        params: Option<&Value>,
        client: &ClientHandle,
    ) -> Result<Value, RpcError>;
}

/// Per-connection handle shared with the broadcaster and handlers.
#[derive(Clone)]
pub struct ClientHandle {
    pub client_id: u64,
    subscribed: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    pub fn set_subscribed(&self, enable: bool) {
        self.subscribed.store(enable, Ordering::SeqCst);
    }

    /// Queue one line for this client; `false` when the writer is gone.
    fn send_line(&self, line: String) -> bool {
        self.sender.send(line).is_ok()
    }
}

/// Fan-out of notifications to connected clients.
#[derive(Clone, Default)]
pub struct Broadcaster {
    clients: Arc<Mutex<HashMap<u64, ClientHandle>>>,
    next_id: Arc<AtomicU64>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, sender: mpsc::UnboundedSender<String>) -> ClientHandle {
        let client_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = ClientHandle {
            client_id,
            subscribed: Arc::new(AtomicBool::new(false)),
            sender,
        };
        self.clients.lock().insert(client_id, handle.clone());
        handle
    }

    pub(crate) fn unregister(&self, client_id: u64) {
        self.clients.lock().remove(&client_id);
    }

    /// Broadcast a ring entry to subscribed clients.
    pub fn broadcast_event(&self, entry: &RingEntry) {
        let params = match serde_json::to_value(entry) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "unserializable ring entry");
                return;
            }
        };
        self.broadcast("event_notification", params);
    }

    /// Broadcast an arbitrary notification to subscribed clients.
    pub fn broadcast(&self, method: &str, params: Value) {
        let line = protocol::notification_line(method, params);

        let mut dead = Vec::new();
        {
            let clients = self.clients.lock();
            for (client_id, client) in clients.iter() {
                if !client.is_subscribed() {
                    continue;
                }
                if !client.send_line(line.clone()) {
                    dead.push(*client_id);
                }
            }
        }
        for client_id in dead {
            debug!(client_id, "dropping dead subscriber");
            self.unregister(client_id);
        }
    }

    /// Connected clients with subscription status (for `list_monitors`).
    pub fn client_list(&self) -> Vec<(u64, bool)> {
        let mut list: Vec<(u64, bool)> = self
            .clients
            .lock()
            .values()
            .map(|c| (c.client_id, c.is_subscribed()))
            .collect();
        list.sort_by_key(|(id, _)| *id);
        list
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }
}

/// RPC listener: accepts connections and spawns per-connection tasks.
pub struct Listener<S: RpcService> {
    socket: UnixListener,
    service: Arc<S>,
    broadcaster: Broadcaster,
}

impl<S: RpcService> Listener<S> {
    pub fn new(socket: UnixListener, service: Arc<S>, broadcaster: Broadcaster) -> Self {
        Self {
            socket,
            service,
            broadcaster,
        }
    }

    /// Accept loop; runs until the task is aborted.
    pub async fn run(self) {
        info!("RPC listener running");
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let service = Arc::clone(&self.service);
                    let broadcaster = self.broadcaster.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, service, broadcaster).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "RPC accept error");
                }
            }
        }
    }
}

async fn handle_connection<S: RpcService>(
    stream: UnixStream,
    service: Arc<S>,
    broadcaster: Broadcaster,
) {
    let (read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client = broadcaster.register(tx);
    let client_id = client.client_id;
    debug!(client_id, "RPC client connected");

    // Writer task: one line per message, shared by responses and
    // notifications
    let writer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if write_half.write_all(b"\n").await.is_err() {
                break;
            }
        }
    });

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(client_id, error = %e, "RPC read error");
                break;
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = dispatch(trimmed, service.as_ref(), &client).await;
        if !client.send_line(response) {
            break;
        }
    }

    broadcaster.unregister(client_id);
    writer.abort();
    debug!(client_id, "RPC client disconnected");
}

/// Parse and dispatch one request line, producing the response line.
pub async fn dispatch<S: RpcService>(line: &str, service: &S, client: &ClientHandle) -> String {
    let request = match protocol::parse_request(line) {
        Ok(request) => request,
        Err(e) => return protocol::error_line(None, e.code, &e.message),
    };

    match service
        .handle(&request.method, request.params.as_ref(), client)
        .await
    {
        Ok(result) => protocol::response_line(request.id, result),
        Err(e) => protocol::error_line(request.id, e.code, &e.message),
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
