//! MCP Client Layer
//!
//! High-level client over a [`Transport`]: performs the initialize handshake,
//! discovers the tool catalog, and issues `tools/call` invocations.
//!
//! # Architecture
//!
//! The client is generic over the transport so tests can substitute scripted
//! transports for a real child process. Exactly one request is outstanding at
//! a time: every call sends one line and then blocks on the next response
//! line, so request/response pairing is strict FIFO.
//!
//! # Usage
//!
//! ```ignore
//! let transport = StdioTransport::spawn(&cfg.command, &cfg.args, &cfg.env)?;
//! let mut client = McpClient::new(transport);
//! client.initialize().await?;
//! let outcome = client.call_tool("get_forecast", json!({"latitude": 51.5, "longitude": -0.1})).await;
//! ```

use crate::mcp::protocol::{
    methods, ClientCapabilities, ClientInfo, InitializeParams, JsonRpcRequest, JsonRpcResponse,
    ToolDescriptor, PROTOCOL_VERSION,
};
use crate::mcp::transport::{Transport, TransportError};
use serde_json::json;
use std::time::Duration;

/// Fixed guard message returned when calling a tool before the handshake
pub const NOT_CONNECTED: &str = "not connected to tool server";

/// Fixed message returned for response bodies with neither result nor error,
/// and for lines that are not decodable JSON-RPC
pub const UNKNOWN_RESPONSE_FORMAT: &str = "unknown response format";

/// Default bound on how long one call may wait for its response line
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised during the initialize/discovery handshake
///
/// A failed handshake leaves the client permanently not-connected for that
/// attempt; the caller reconnects from scratch if it wants to retry.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The transport failed while exchanging handshake messages
    #[error("transport error during handshake: {0}")]
    Transport(#[from] TransportError),

    /// The server answered a handshake request with an error
    #[error("tool server rejected handshake: {0}")]
    Rejected(String),

    /// The tool catalog in the `tools/list` response was not parseable
    #[error("malformed tool catalog: {0}")]
    Catalog(String),
}

/// Discriminated outcome of a tool invocation
///
/// This is the only value callers of [`McpClient::call_tool`] ever see; no
/// transport or protocol error propagates past the client boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The server returned a `result` payload, passed through unmodified
    Success(serde_json::Value),

    /// The call failed; the message is the remote error text, a transport
    /// error description, or one of the fixed guard messages
    Failure(String),
}

impl ToolOutcome {
    /// Whether this outcome carries a result payload
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }
}

/// High-level MCP client
///
/// # Lifecycle
///
/// 1. Create with [`McpClient::new`]
/// 2. [`McpClient::initialize`] performs the handshake and tool discovery
/// 3. Issue calls with [`McpClient::call_tool`]
/// 4. Drop the client (or terminate the transport) when done
#[derive(Debug)]
pub struct McpClient<T>
where
    T: Transport,
{
    /// Underlying transport for sending/receiving messages
    transport: T,

    /// True only after initialize, initialized and discovery all succeeded
    connected: bool,

    /// Tool catalog, replaced wholesale on each discovery, arrival order
    tools: Vec<ToolDescriptor>,

    /// Bound on how long one call waits for its response line
    call_timeout: Duration,
}

impl<T> McpClient<T>
where
    T: Transport,
{
    /// Create a new client over the given transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            connected: false,
            tools: Vec::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Override the per-call response timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Whether the handshake has completed on this connection
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Read-only snapshot of the discovered tool catalog, in arrival order
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Mark the connection unusable (after an explicit teardown)
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
    }

    /// Send one request and await its response line, bounded by the timeout
    async fn request(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, TransportError> {
        let request = JsonRpcRequest::request(method, params);
        self.transport.send(&request).await?;

        match tokio::time::timeout(self.call_timeout, self.transport.recv()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.call_timeout)),
        }
    }

    /// Perform the session handshake
    ///
    /// Strictly ordered: (1) `initialize` request, awaited; (2)
    /// `notifications/initialized` notification; (3) tool discovery. The
    /// connection becomes usable only after all three succeed.
    ///
    /// Returns the discovery signal: `true` if at least one tool was
    /// advertised. An empty catalog is not an error and does not gate the
    /// connection.
    pub async fn initialize(&mut self) -> Result<bool, HandshakeError> {
        tracing::info!("Initializing tool server session");

        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let params = serde_json::to_value(&params)
            .map_err(|e| HandshakeError::Rejected(e.to_string()))?;

        let response = self.request(methods::INITIALIZE, Some(params)).await?;
        if let Some(error) = response.error {
            return Err(HandshakeError::Rejected(error.message));
        }

        // Fire-and-forget: no identifier, no response to await
        self.transport
            .send(&JsonRpcRequest::notification(methods::INITIALIZED))
            .await?;

        let found = self.discover_tools().await?;

        self.connected = true;
        tracing::info!("Tool server session ready ({} tools)", self.tools.len());

        Ok(found)
    }

    /// Discover the tool catalog via `tools/list`
    ///
    /// Replaces the held catalog wholesale. Returns `true` if at least one
    /// tool was parsed; an empty list is reported as `false` but is not an
    /// error. An entry without a `name` fails the whole call.
    pub async fn discover_tools(&mut self) -> Result<bool, HandshakeError> {
        tracing::debug!("Listing available tools from tool server");

        let response = self.request(methods::TOOLS_LIST, None).await?;
        if let Some(error) = response.error {
            return Err(HandshakeError::Catalog(error.message));
        }

        let result = response
            .result
            .ok_or_else(|| HandshakeError::Catalog("tools/list response missing result".into()))?;

        let entries = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        let tools: Vec<ToolDescriptor> = serde_json::from_value(entries)
            .map_err(|e| HandshakeError::Catalog(e.to_string()))?;

        tracing::info!("Discovered {} tools", tools.len());
        for tool in &tools {
            tracing::debug!("  - {}: {}", tool.name, tool.description);
        }

        self.tools = tools;
        Ok(!self.tools.is_empty())
    }

    /// Call a named tool with the given arguments
    ///
    /// The single entry point for feature logic. Always returns a
    /// [`ToolOutcome`]; transport and protocol failures are absorbed here and
    /// never raised to the caller:
    ///
    /// - response with `result` — success with that payload, unmodified
    /// - response with `error` — failure with the remote message verbatim
    /// - neither, or an undecodable line — failure with
    ///   [`UNKNOWN_RESPONSE_FORMAT`]
    /// - transport error or timeout — failure with the error's description
    pub async fn call_tool(&mut self, name: &str, arguments: serde_json::Value) -> ToolOutcome {
        if !self.connected {
            return ToolOutcome::Failure(NOT_CONNECTED.to_string());
        }

        tracing::debug!("Calling tool {} with arguments {}", name, arguments);

        let params = json!({
            "name": name,
            "arguments": arguments,
        });

        match self.request(methods::TOOLS_CALL, Some(params)).await {
            Ok(response) => match (response.result, response.error) {
                (Some(result), None) => ToolOutcome::Success(result),
                (_, Some(error)) => ToolOutcome::Failure(error.message),
                (None, None) => ToolOutcome::Failure(UNKNOWN_RESPONSE_FORMAT.to_string()),
            },
            Err(TransportError::Malformed(_)) => {
                ToolOutcome::Failure(UNKNOWN_RESPONSE_FORMAT.to_string())
            }
            Err(e) => {
                if matches!(e, TransportError::Closed) {
                    self.connected = false;
                }
                ToolOutcome::Failure(e.to_string())
            }
        }
    }
}
