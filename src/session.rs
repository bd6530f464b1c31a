//! Weather Session
//!
//! Owns the single tool-server connection and exposes the feature-level
//! operations (forecast and alerts lookups) on top of it.
//!
//! # Design
//!
//! The session is an explicit, injected object rather than a process-wide
//! global: the binary constructs one and hands it to the UI layer. A
//! `tokio::Mutex` over the optional client serializes all invocations, so at
//! most one call is in flight on the connection at any time, and exactly one
//! connection is active at a time.

use crate::config::{ConfigSupplier, ServerConfig};
use crate::mcp::client::{DEFAULT_CALL_TIMEOUT, NOT_CONNECTED};
use crate::mcp::{HandshakeError, McpClient, StdioTransport, ToolDescriptor, ToolOutcome, Transport, TransportError};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;

/// Why a connection attempt failed
///
/// All variants surface to the UI as a failed-connection message; none of
/// them abort the application.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The config supplier has no entry for the requested server key
    #[error("no tool server configured under key '{0}'")]
    ConfigMissing(String),

    /// The tool-server executable could not be started
    #[error("failed to start tool server: {0}")]
    Spawn(TransportError),

    /// The initialize/discovery handshake failed
    #[error("handshake with tool server failed: {0}")]
    Handshake(#[from] HandshakeError),
}

/// One weather tool-server session
pub struct WeatherSession {
    /// Supplies the spawn configuration for the tool server
    supplier: ConfigSupplier,

    /// Key under `mcpServers` naming the weather server entry
    server_key: String,

    /// Per-call response timeout handed to the client
    call_timeout: Duration,

    /// The connected client, if any. The mutex serializes calls.
    inner: Mutex<Option<McpClient<StdioTransport>>>,
}

impl WeatherSession {
    /// Create a session for the given config supplier and server key
    pub fn new(supplier: ConfigSupplier, server_key: impl Into<String>) -> Self {
        Self {
            supplier,
            server_key: server_key.into(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            inner: Mutex::new(None),
        }
    }

    /// Override the per-call response timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Spawn the tool server and perform the handshake
    ///
    /// Any previously active connection is terminated first, so exactly one
    /// connection exists at a time. On success, returns the discovered tool
    /// catalog; on failure, the session is left disconnected and the spawned
    /// process (if any) has been reaped.
    pub async fn connect(&self) -> Result<Vec<ToolDescriptor>, ConnectError> {
        let config: ServerConfig = self
            .supplier
            .server_config(&self.server_key)
            .ok_or_else(|| ConnectError::ConfigMissing(self.server_key.clone()))?;

        let mut guard = self.inner.lock().await;

        if let Some(mut old) = guard.take() {
            tracing::info!("Replacing existing tool server connection");
            old.transport_mut().terminate().await;
            old.mark_disconnected();
        }

        let transport = StdioTransport::spawn(&config.command, &config.args, &config.env)
            .map_err(ConnectError::Spawn)?;

        let mut client = McpClient::new(transport).with_call_timeout(self.call_timeout);

        // On error the client is dropped here and its Drop impl reaps the
        // child; the session stays disconnected.
        let found = client.initialize().await?;
        if !found {
            tracing::warn!("Tool server advertised no tools");
        }

        let tools = client.tools().to_vec();
        *guard = Some(client);
        Ok(tools)
    }

    /// Terminate the connection
    ///
    /// Idempotent: disconnecting an already-disconnected session is a no-op.
    /// The session can connect again afterwards.
    pub async fn disconnect(&self) {
        if let Some(mut client) = self.inner.lock().await.take() {
            client.transport_mut().terminate().await;
            client.mark_disconnected();
            tracing::info!("Tool server session closed");
        }
    }

    /// Whether a handshaken connection is currently held
    pub async fn is_connected(&self) -> bool {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|c| c.is_connected())
            .unwrap_or(false)
    }

    /// Snapshot of the discovered tool catalog (empty when disconnected)
    pub async fn tools(&self) -> Vec<ToolDescriptor> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|c| c.tools().to_vec())
            .unwrap_or_default()
    }

    /// Get a weather forecast, rendered as user-facing text
    ///
    /// Tries a bounded, ordered list of argument shapes: the coordinate pair
    /// first, then a location string, then a generic query string. This
    /// compensates for weather servers with inconsistent parameter naming.
    pub async fn forecast(&self, location: &str, latitude: f64, longitude: f64) -> String {
        let attempts = [
            (
                "get_forecast",
                json!({"latitude": latitude, "longitude": longitude}),
            ),
            ("get_forecast", json!({"location": location})),
            ("get_forecast", json!({"query": location})),
        ];

        let mut guard = self.inner.lock().await;
        let Some(client) = guard.as_mut() else {
            return format!("Error: {}", NOT_CONNECTED);
        };

        render_outcome(invoke_with_fallback(client, &attempts).await)
    }

    /// Get active weather alerts for a US state, rendered as user-facing text
    ///
    /// The caller's authorization token, when present, is forwarded to the
    /// tool as `authToken`. Role checks happen above this layer.
    pub async fn alerts(&self, state: &str, auth_token: Option<&str>) -> String {
        let mut arguments = json!({"state": state});
        if let Some(token) = auth_token {
            arguments["authToken"] = Value::String(token.to_string());
        }
        let attempts = [("get_alerts", arguments)];

        let mut guard = self.inner.lock().await;
        let Some(client) = guard.as_mut() else {
            return format!("Error: {}", NOT_CONNECTED);
        };

        render_outcome(invoke_with_fallback(client, &attempts).await)
    }
}

/// Try each `(tool name, arguments)` attempt in order until one succeeds
///
/// An attempt counts as failed when the call itself fails or when the
/// returned payload carries an explicit `isError: true` flag. The outcome of
/// the last attempt is returned when all of them fail. The list is bounded
/// and fixed by the caller; this is not a transport-level retry.
pub(crate) async fn invoke_with_fallback<T: Transport>(
    client: &mut McpClient<T>,
    attempts: &[(&str, Value)],
) -> ToolOutcome {
    let mut last = ToolOutcome::Failure("no invocation attempts configured".to_string());

    for (tool_name, arguments) in attempts {
        let outcome = client.call_tool(tool_name, arguments.clone()).await;
        match &outcome {
            ToolOutcome::Success(payload) if !payload_flags_error(payload) => return outcome,
            ToolOutcome::Success(_) => {
                tracing::debug!("Tool {} flagged an error in its payload, trying next argument shape", tool_name);
            }
            ToolOutcome::Failure(message) => {
                tracing::debug!("Tool {} attempt failed: {}", tool_name, message);
            }
        }
        last = outcome;
    }

    last
}

/// Whether a success payload explicitly flags an error
fn payload_flags_error(payload: &Value) -> bool {
    payload
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Map a tool outcome to user-facing text
///
/// Payload interpretation is a caller policy, not a client concern: the
/// weather features read `content[0].text` when present and fall back to a
/// pretty dump of the whole payload otherwise.
fn render_outcome(outcome: ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Failure(message) => format!("Error: {}", message),
        ToolOutcome::Success(payload) => render_payload(&payload),
    }
}

fn render_payload(payload: &Value) -> String {
    if let Some(text) = payload
        .get("content")
        .and_then(Value::as_array)
        .and_then(|content| content.first())
        .and_then(|entry| entry.get("text"))
        .and_then(Value::as_str)
    {
        return text.to_string();
    }

    serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
}
