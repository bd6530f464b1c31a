// Skycast - Main Entry Point
//
// Builds the single weather session, wires it into the axum UI and serves
// until ctrl-c. The tool server is spawned lazily on the first connect.

use anyhow::Result;
use clap::Parser;
use skycast::auth;
use skycast::config::ConfigSupplier;
use skycast::geocode;
use skycast::session::WeatherSession;
use skycast::web::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Skycast: weather lookups over a spawned MCP tool server
#[derive(Parser, Debug)]
#[command(name = "skycast")]
#[command(version = "0.1.0")]
#[command(about = "Weather forecasts and alerts via a local MCP tool server", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Port for the browser UI
    #[arg(short, long, default_value_t = 7860)]
    port: u16,

    /// Explicit path to the Claude-desktop-style config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Key under `mcpServers` naming the weather server entry
    #[arg(long, default_value = "weather")]
    server: String,

    /// Per-call response timeout in seconds
    #[arg(long, default_value_t = 30)]
    call_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(filter.into())
                .from_env_lossy(),
        )
        .init();

    info!("Skycast v{} starting...", env!("CARGO_PKG_VERSION"));

    let supplier = match args.config {
        Some(path) => ConfigSupplier::from_path(path),
        None => ConfigSupplier::discover(),
    };

    let session = WeatherSession::new(supplier, args.server)
        .with_call_timeout(Duration::from_secs(args.call_timeout_secs));

    let geocode_api_key = std::env::var(geocode::API_KEY_ENV).ok();
    if geocode_api_key.is_none() {
        tracing::warn!(
            "{} not set; forecast lookups will not be able to geocode",
            geocode::API_KEY_ENV
        );
    }

    let state = Arc::new(AppState {
        session,
        http: reqwest::Client::new(),
        geocode_api_key,
        required_role: auth::required_role(),
    });

    web::serve(state, args.port).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["skycast"]);
        assert_eq!(args.port, 7860);
        assert_eq!(args.server, "weather");
        assert_eq!(args.call_timeout_secs, 30);
        assert!(!args.verbose);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "skycast",
            "--verbose",
            "--port",
            "8080",
            "--server",
            "weather-staging",
            "--config",
            "/tmp/claude.json",
        ]);
        assert!(args.verbose);
        assert_eq!(args.port, 8080);
        assert_eq!(args.server, "weather-staging");
        assert_eq!(args.config, Some(PathBuf::from("/tmp/claude.json")));
    }
}
