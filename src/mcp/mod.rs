//! MCP (Model Context Protocol) Client Implementation
//!
//! A small, purpose-built MCP client for the weather tool server, written
//! directly on Tokio and Serde (no external SDK).
//!
//! # Architecture
//!
//! The implementation is organized into three layers:
//!
//! 1. **Protocol Layer** (`protocol`): JSON-RPC 2.0 message types
//! 2. **Transport Layer** (`transport`): stdio child-process transport
//! 3. **Client Layer** (`client`): handshake, tool catalog, invocation client
//!
//! One connection is active at a time and exactly one request is in flight at
//! a time; responses are consumed in the order requests were sent.

// Protocol layer: JSON-RPC 2.0 message types
pub mod protocol;

// Transport layer: stdio child-process transport
pub mod transport;

// Client layer: handshake, catalog and invocation API
pub mod client;

// Re-export commonly used types for convenience
pub use client::{HandshakeError, McpClient, ToolOutcome};
pub use protocol::{JsonRpcRequest, JsonRpcResponse, RpcError, ToolDescriptor};
pub use transport::{StdioTransport, Transport, TransportError};
