//! Skycast
//!
//! A demo application exposing weather-forecast and weather-alert lookups
//! through a browser UI, backed by a locally spawned MCP tool-server process
//! speaking JSON-RPC over its standard input/output streams.
//!
//! The substantive part is the tool-invocation client in [`mcp`]: process
//! lifecycle, session handshake, tool discovery, and synchronous
//! request/response call semantics. Everything else (config discovery,
//! geocoding, token parsing, the web UI) is thin glue around it.

pub mod auth;
pub mod config;
pub mod geocode;
pub mod mcp;
pub mod session;
pub mod web;
