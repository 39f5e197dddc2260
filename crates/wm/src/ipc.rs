// SPDX-License-Identifier: MIT

//! Wire format encoding/decoding for the i3/Sway IPC protocol.
//!
//! Wire format: 6-byte magic `i3-ipc` + u32 payload length (native
//! endian) + u32 message type + JSON payload. Event messages set the
//! high bit of the type field.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Protocol magic preceding every message.
pub const MAGIC: &[u8; 6] = b"i3-ipc";

/// Maximum accepted payload (a 100-window tree is well under 1 MB).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// High bit distinguishing events from command replies.
pub const EVENT_BIT: u32 = 1 << 31;

// Message types (replies use the same code as the request).
pub const RUN_COMMAND: u32 = 0;
pub const GET_WORKSPACES: u32 = 1;
pub const SUBSCRIBE: u32 = 2;
pub const GET_OUTPUTS: u32 = 3;
pub const GET_TREE: u32 = 4;
pub const GET_MARKS: u32 = 5;
pub const GET_VERSION: u32 = 7;
pub const SEND_TICK: u32 = 10;

// Event type codes (low bits; the wire value has EVENT_BIT set).
pub const EVENT_WORKSPACE: u32 = 0;
pub const EVENT_OUTPUT: u32 = 1;
pub const EVENT_MODE: u32 = 2;
pub const EVENT_WINDOW: u32 = 3;
pub const EVENT_BINDING: u32 = 5;
pub const EVENT_SHUTDOWN: u32 = 6;
pub const EVENT_TICK: u32 = 7;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad magic: expected 'i3-ipc', got {0:?}")]
    BadMagic([u8; 6]),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout")]
    Timeout,
}

/// A raw message off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: u32,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn is_event(&self) -> bool {
        self.msg_type & EVENT_BIT != 0
    }

    /// Event code with the event bit stripped.
    pub fn event_code(&self) -> u32 {
        self.msg_type & !EVENT_BIT
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// Write one framed message to an async writer.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg_type: u32,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(14 + payload.len());
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
    frame.extend_from_slice(&msg_type.to_ne_bytes());
    frame.extend_from_slice(payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message from an async reader.
pub async fn read_message<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Message, ProtocolError> {
    let mut header = [0u8; 14];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }

    let mut magic = [0u8; 6];
    magic.copy_from_slice(&header[..6]);
    if &magic != MAGIC {
        return Err(ProtocolError::BadMagic(magic));
    }

    let len = u32::from_ne_bytes([header[6], header[7], header[8], header[9]]) as usize;
    let msg_type = u32::from_ne_bytes([header[10], header[11], header[12], header[13]]);

    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Message { msg_type, payload })
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
