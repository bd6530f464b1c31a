//! stdio transport for the weather tool server
//!
//! The transport owns the spawned child process and its byte streams. Each
//! message is one newline-terminated JSON line written to the child's stdin
//! and read back from its stdout.
//!
//! # Architecture
//!
//! The transport layer is responsible only for spawning, sending and
//! receiving. Protocol concerns (JSON-RPC shapes) are handled in the protocol
//! layer; handshake and call semantics live in the client layer.

use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Errors raised below the invocation-client boundary
///
/// The client layer converts all of these into failure outcomes; none of them
/// escape to the feature layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The tool-server executable could not be started
    #[error("failed to spawn tool server process: {0}")]
    Spawn(std::io::Error),

    /// Reading from or writing to the child's pipes failed
    #[error("tool server i/o error: {0}")]
    Io(std::io::Error),

    /// The child closed its output stream (end of stream)
    #[error("tool server closed its output stream")]
    Closed,

    /// A line arrived that is not decodable JSON-RPC
    #[error("undecodable line from tool server: {0}")]
    Malformed(serde_json::Error),

    /// No response line arrived within the per-call timeout
    #[error("timed out after {0:?} waiting for tool server response")]
    Timeout(std::time::Duration),
}

/// Transport trait for tool-server communication
///
/// The client is generic over this trait so tests can substitute a scripted
/// transport for a real child process.
#[allow(async_fn_in_trait)]
pub trait Transport: Send {
    /// Send one request (or notification) to the tool server
    async fn send(&mut self, request: &JsonRpcRequest) -> Result<(), TransportError>;

    /// Receive the next response line from the tool server
    ///
    /// Blocks the calling task until a line is available, the stream closes
    /// (`TransportError::Closed`), or an undecodable line arrives
    /// (`TransportError::Malformed`).
    async fn recv(&mut self) -> Result<JsonRpcResponse, TransportError>;

    /// Check if the transport is still connected
    fn is_connected(&self) -> bool;
}

/// stdio transport over a spawned tool-server child process
///
/// # Example
///
/// ```ignore
/// let mut transport = StdioTransport::spawn("node", &args, &env)?;
/// transport.send(&request).await?;
/// let response = transport.recv().await?;
/// transport.terminate().await;
/// ```
pub struct StdioTransport {
    /// Child process handle
    child: Option<Child>,

    /// stdin handle for sending requests
    stdin: ChildStdin,

    /// stdout handle for receiving responses
    stdout: BufReader<ChildStdout>,

    /// Server command line (for diagnostics)
    command: String,

    /// Whether the transport is still connected
    connected: bool,

    /// Reusable buffer for reading lines
    line_buffer: String,
}

impl StdioTransport {
    /// Spawn a tool-server process and wire up a stdio transport
    ///
    /// The child environment is the current process environment overlaid with
    /// `env_overrides`. stderr is inherited so server logs stay visible.
    ///
    /// # Arguments
    ///
    /// * `command` - The executable to spawn (e.g. "npx", "python")
    /// * `args` - Arguments to pass to the command
    /// * `env_overrides` - Environment variables layered on top of the
    ///   current environment
    pub fn spawn(
        command: &str,
        args: &[String],
        env_overrides: &HashMap<String, String>,
    ) -> Result<Self, TransportError> {
        tracing::info!("Spawning tool server: {}", command);
        tracing::debug!("Server arguments: {:?}", args);

        let mut child = Command::new(command)
            .args(args)
            .envs(env_overrides)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(TransportError::Spawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Spawn(std::io::Error::other("child stdin unavailable")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Spawn(std::io::Error::other("child stdout unavailable")))?;

        Ok(Self {
            child: Some(child),
            stdin,
            stdout: BufReader::new(stdout),
            command: format!("{} {}", command, args.join(" ")),
            connected: true,
            line_buffer: String::with_capacity(4096),
        })
    }

    /// Get the server command line (for diagnostics)
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Terminate the tool-server process
    ///
    /// Idempotent: calling this when no process is running is a no-op. Any
    /// task blocked in `recv` observes the closed stream as
    /// `TransportError::Closed`.
    pub async fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::info!("Terminating tool server: {}", self.command);
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill tool server process: {}", e);
            }
        }
        self.connected = false;
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        // Backstop so the child is reaped on every exit path, including
        // handshake failures. We cannot await in Drop, so just start the kill.
        if let Some(mut child) = self.child.take() {
            tracing::debug!("Dropping StdioTransport, killing tool server");
            let _ = child.start_kill();
        }
    }
}

impl Transport for StdioTransport {
    /// Serialize the request and write it as one flushed line to stdin
    async fn send(&mut self, request: &JsonRpcRequest) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Closed);
        }

        let json = serde_json::to_string(request)
            .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;

        tracing::debug!("Sending to tool server: {}", json);

        self.stdin
            .write_all(json.as_bytes())
            .await
            .map_err(TransportError::Io)?;
        self.stdin
            .write_all(b"\n")
            .await
            .map_err(TransportError::Io)?;

        // Flush so the server observes the line without buffering delay
        self.stdin.flush().await.map_err(TransportError::Io)?;

        Ok(())
    }

    /// Read one line from stdout and deserialize it
    async fn recv(&mut self) -> Result<JsonRpcResponse, TransportError> {
        if !self.connected {
            return Err(TransportError::Closed);
        }

        // Clear buffer for reuse to avoid allocation
        self.line_buffer.clear();

        let bytes_read = self
            .stdout
            .read_line(&mut self.line_buffer)
            .await
            .map_err(TransportError::Io)?;

        if bytes_read == 0 {
            self.connected = false;
            return Err(TransportError::Closed);
        }

        tracing::debug!("Received from tool server: {}", self.line_buffer.trim());

        serde_json::from_str(&self.line_buffer).map_err(TransportError::Malformed)
    }

    fn is_connected(&self) -> bool {
        self.connected && self.child.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Write a shell script into a temp dir and mark it executable
    #[cfg(unix)]
    fn setup_test_script(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("fake_server.sh");
        std::fs::write(&path, content).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn spawn_script(dir: &tempfile::TempDir, content: &str) -> StdioTransport {
        let path = setup_test_script(dir, content);
        StdioTransport::spawn(path.to_str().unwrap(), &[], &HashMap::new())
            .expect("failed to spawn test script")
    }

    #[test]
    fn test_spawn_unknown_executable() {
        let result = StdioTransport::spawn(
            "/nonexistent/skycast-test-binary",
            &[],
            &HashMap::new(),
        );
        assert!(matches!(result, Err(TransportError::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = spawn_script(
            &dir,
            "#!/bin/sh\nwhile IFS= read -r line; do echo \"$line\"; done\n",
        );

        let request = JsonRpcRequest::request("tools/list", None);
        transport.send(&request).await.expect("send failed");

        // The echo server reflects our own request line; the lenient response
        // type still decodes it, which is all the transport guarantees.
        let response = transport.recv().await.expect("recv failed");
        assert_eq!(
            response.id,
            Some(serde_json::Value::String(request.id.clone().unwrap()))
        );

        transport.terminate().await;
        assert!(!transport.is_connected());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_env_overrides_reach_child() {
        let dir = tempfile::tempdir().unwrap();
        let path = setup_test_script(
            &dir,
            "#!/bin/sh\nread line\necho \"{\\\"jsonrpc\\\":\\\"2.0\\\",\\\"id\\\":\\\"1\\\",\\\"result\\\":\\\"$SKYCAST_TEST_MARKER\\\"}\"\n",
        );

        let mut env = HashMap::new();
        env.insert("SKYCAST_TEST_MARKER".to_string(), "overlay".to_string());

        let mut transport =
            StdioTransport::spawn(path.to_str().unwrap(), &[], &env).expect("spawn failed");
        transport
            .send(&JsonRpcRequest::request("initialize", None))
            .await
            .unwrap();

        let response = transport.recv().await.unwrap();
        assert_eq!(response.result, Some(serde_json::json!("overlay")));

        transport.terminate().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recv_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = spawn_script(&dir, "#!/bin/sh\nexit 0\n");

        let result = transport.recv().await;
        assert!(matches!(result, Err(TransportError::Closed)));
        assert!(!transport.is_connected());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recv_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = spawn_script(&dir, "#!/bin/sh\necho 'this is not json'\nsleep 5\n");

        let result = transport.recv().await;
        assert!(matches!(result, Err(TransportError::Malformed(_))));

        transport.terminate().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = spawn_script(&dir, "#!/bin/sh\nsleep 100\n");

        transport.terminate().await;
        assert!(!transport.is_connected());

        // Second terminate must be a no-op
        transport.terminate().await;
        assert!(!transport.is_connected());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_send_after_terminate_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = spawn_script(&dir, "#!/bin/sh\nsleep 100\n");

        transport.terminate().await;

        let result = transport
            .send(&JsonRpcRequest::request("tools/list", None))
            .await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
