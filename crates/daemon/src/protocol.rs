// SPDX-License-Identifier: MIT

//! JSON-RPC 2.0 over newline-delimited UTF-8.
//!
//! Requests and responses are single-line JSON objects; server-initiated
//! notifications (no `id`) stream over the same connection to subscribed
//! clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// A decoded request line.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Handler-level error carried back as a JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
        }
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: detail.into(),
        }
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: detail.to_string(),
        }
    }
}

/// Encode a success response line.
pub fn response_line(id: Option<Value>, result: Value) -> String {
    let body = serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    });
    body.to_string()
}

/// Encode an error response line.
pub fn error_line(id: Option<Value>, code: i64, message: &str) -> String {
    let body = serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": {"code": code, "message": message},
    });
    body.to_string()
}

/// Encode a server-initiated notification line.
pub fn notification_line(method: &str, params: Value) -> String {
    let body = serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params,
    });
    body.to_string()
}

/// Parse one request line.
pub fn parse_request(line: &str) -> Result<RpcRequest, RpcError> {
    let request: RpcRequest = serde_json::from_str(line).map_err(|e| RpcError {
        code: PARSE_ERROR,
        message: format!("Parse error: {e}"),
    })?;

    if request.method.is_empty() {
        return Err(RpcError {
            code: INVALID_REQUEST,
            message: "missing method".to_string(),
        });
    }
    Ok(request)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
