//! Tool-Server Configuration Discovery
//!
//! The weather tool server is configured the same way Claude Desktop
//! configures MCP servers: a JSON file with an `mcpServers` map keyed by
//! server name, each entry carrying a command, arguments and environment
//! overrides. This module locates that file across the usual install
//! locations and supplies the entry for a given key.
//!
//! A missing file or missing key is a normal "cannot connect" condition, not
//! an error: the supplier returns `None` and the connection attempt reports
//! failure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Everything needed to spawn one tool-server process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Executable to spawn (e.g. "npx", "python", "./server")
    pub command: String,

    /// Arguments for the executable
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables overlaid onto the current process environment
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Locates and reads the Claude-desktop-style configuration file
#[derive(Debug, Clone)]
pub struct ConfigSupplier {
    /// Resolved config file path, if any candidate exists
    path: Option<PathBuf>,
}

impl ConfigSupplier {
    /// Search the well-known locations for a config file
    pub fn discover() -> Self {
        let path = candidate_paths().into_iter().find(|p| p.exists());
        match &path {
            Some(p) => tracing::info!("Using tool server config: {}", p.display()),
            None => tracing::warn!("No tool server config file found"),
        }
        Self { path }
    }

    /// Use an explicit config file path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// The resolved config file path, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up the spawn configuration for `mcpServers.<key>`
    ///
    /// Returns `None` when the file is missing, unreadable, malformed, or the
    /// key is not configured. All of these are reported (at WARN) and treated
    /// as the same non-fatal "unconfigured" condition.
    pub fn server_config(&self, key: &str) -> Option<ServerConfig> {
        let path = self.path.as_ref()?;

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                return None;
            }
        };

        let root: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                return None;
            }
        };

        let entry = root.get("mcpServers")?.get(key)?.clone();
        match serde_json::from_value(entry) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Invalid server entry '{}' in {}: {}", key, path.display(), e);
                None
            }
        }
    }
}

/// Candidate config file locations, checked in order
///
/// Mirrors the Claude Desktop install locations on macOS, Linux and Windows,
/// plus the local weather-server checkout used by the demo.
fn candidate_paths() -> Vec<PathBuf> {
    let Some(home) = home_dir() else {
        return Vec::new();
    };

    vec![
        home.join("mcp-weather-server/claude_desktop_config.json"),
        home.join("Library/Application Support/Claude/claude_desktop_config.json"),
        home.join(".config/claude/claude_desktop_config.json"),
        home.join("AppData/Roaming/Claude/claude_desktop_config.json"),
    ]
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
