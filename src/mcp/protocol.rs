//! MCP Protocol Types (JSON-RPC 2.0)
//!
//! This module defines the wire types for talking to the weather tool server.
//! MCP is built on top of JSON-RPC 2.0: every exchange is one JSON object per
//! newline-terminated line.
//!
//! # Protocol Specification
//!
//! - JSON-RPC 2.0: <https://www.jsonrpc.org/specification>
//! - MCP Spec: <https://modelcontextprotocol.io/specification/2024-11-05>
//!
//! # Architecture
//!
//! The protocol layer is responsible only for serialization/deserialization of
//! messages. Transport concerns (child process, pipes) are handled in the
//! transport layer; call semantics live in the client layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision advertised during the handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Method names used by the client
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

/// A JSON-RPC 2.0 request message
///
/// Requests carry a unique string correlation identifier so the eventual
/// response can be paired with them. A message without an `id` is a
/// notification: it is fire-and-forget and never receives a response.
///
/// # Example
///
/// ```json
/// {
///   "jsonrpc": "2.0",
///   "id": "6f1c…",
///   "method": "tools/list"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// Correlation identifier; `None` makes this a notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Method name to invoke
    pub method: String,

    /// Method parameters (optional, depends on method)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Create a request with a fresh unique correlation identifier
    pub fn request(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(Uuid::new_v4().to_string()),
            method: method.into(),
            params,
        }
    }

    /// Create a notification (no identifier, no response expected)
    pub fn notification(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params: None,
        }
    }

    /// Whether this message is a notification
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC 2.0 response message
///
/// Every field except the envelope itself is optional on purpose: a response
/// that is missing both `result` and `error` is still *decodable* here, and it
/// is the client layer that classifies such a shape as a protocol violation.
///
/// # Example (Success)
///
/// ```json
/// {"jsonrpc": "2.0", "id": "6f1c…", "result": {"tools": []}}
/// ```
///
/// # Example (Error)
///
/// ```json
/// {"jsonrpc": "2.0", "id": "6f1c…", "error": {"code": -32601, "message": "Method not found"}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0" from well-behaved servers)
    pub jsonrpc: Option<String>,

    /// Correlation identifier echoed from the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,

    /// Result payload (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Error information (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// Create a successful response (used by tests and fixtures)
    pub fn ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(serde_json::Value::String(id.into())),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response (used by tests and fixtures)
    pub fn err(id: impl Into<String>, error: RpcError) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(serde_json::Value::String(id.into())),
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcError {
    /// Error code (JSON-RPC defined or server-specific)
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Additional error data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Error {}] {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Initialization parameters sent during the handshake
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitializeParams {
    /// Client protocol version
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,

    /// Client capabilities
    pub capabilities: ClientCapabilities,

    /// Client information
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

/// Client capabilities advertised during initialization
///
/// The weather client declares an empty `tools` capability object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientCapabilities {
    /// Tools capability (empty object)
    pub tools: serde_json::Value,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self {
            tools: empty_object(),
        }
    }
}

/// Client identification information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client name
    pub name: String,

    /// Client version
    pub version: String,
}

/// A tool advertised by the server during discovery
///
/// `name` is required; a catalog entry without one is a protocol violation
/// and fails the whole `tools/list` parse. `description` and `inputSchema`
/// default to an empty string and an empty object when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Tool name (unique identifier)
    pub name: String,

    /// Tool description
    #[serde(default)]
    pub description: String,

    /// Tool input schema (JSON Schema)
    #[serde(default = "empty_object", rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
