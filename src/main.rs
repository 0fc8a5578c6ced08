//! chatrelay - Chat Relay Server
//!
//! Accepts chat client connections and relays each line-delimited JSON
//! request to the central account server, returning the single response
//! line to the originating client.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatrelay::{config::ConfigManager, ConnectionManager, ShutdownCoordinator};

/// CLI arguments for the relay server
#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(about = "Chat relay server between chat clients and the central account server")]
#[command(version)]
#[command(long_about = "
chatrelay - Chat Relay Server

Accepts chat client connections and relays each line-delimited JSON request
to the central account server over a dedicated per-message connection.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  CHATRELAY_BIND_ADDR        - Bind address (e.g., 127.0.0.1:5002)
  CHATRELAY_UPSTREAM_ADDR    - Central server address (e.g., 127.0.0.1:6000)
  CHATRELAY_MAX_CONNECTIONS  - Maximum concurrent client connections
  CHATRELAY_CONNECT_TIMEOUT  - Upstream connect timeout (e.g., 5s)
  CHATRELAY_RESPONSE_TIMEOUT - Upstream response timeout (e.g., 5s)
  CHATRELAY_LOG_LEVEL        - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 127.0.0.1:5002)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Central server address (overrides config file)
    #[arg(short, long, help = "Central server address (e.g., 127.0.0.1:6000)")]
    pub upstream: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", help = "Log level")]
    pub log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Maximum number of concurrent client connections
    #[arg(long, help = "Maximum number of concurrent client connections")]
    pub max_connections: Option<usize>,

    /// Upstream response timeout in seconds
    #[arg(long, help = "Upstream response timeout in seconds")]
    pub timeout: Option<u64>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    init_tracing(&args)?;

    info!("Starting chatrelay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        info!("Config file not found, checking environment variables");
        ConfigManager::load_from_env()?
    };

    // Apply CLI argument overrides (highest priority)
    config.merge_with_cli_args(
        args.bind.as_deref(),
        args.port,
        args.upstream.as_deref(),
        args.max_connections,
        args.timeout,
    );

    // Final validation after all overrides
    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("Configuration summary:");
        info!("  Bind address: {}", config.server.bind_addr);
        info!("  Central server: {}", config.upstream.addr);
        info!("  Max connections: {}", config.server.max_connections);
        info!("  Connect timeout: {:?}", config.upstream.connect_timeout);
        info!("  Response timeout: {:?}", config.upstream.response_timeout);
        return Ok(());
    }

    info!("Configuration loaded successfully");
    info!("Bind address: {}", config.server.bind_addr);
    info!("Central server: {}", config.upstream.addr);
    info!("Max connections: {}", config.server.max_connections);

    let shutdown_coordinator = ShutdownCoordinator::new();

    let connection_manager = ConnectionManager::new(std::sync::Arc::new(config));

    // Channel to hand the shutdown signal to the server task
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let server_handle = tokio::spawn(async move {
        let mut manager = connection_manager;

        tokio::select! {
            result = manager.start() => {
                if let Err(e) = result {
                    error!("Server error: {:#}", e);
                }
            }
            _ = shutdown_rx => {
                info!("Server task received shutdown signal");
                manager.initiate_shutdown();
                if let Err(e) = manager.wait_for_connections_to_close().await {
                    error!("Error during connection cleanup: {:#}", e);
                }
            }
        }
    });

    info!("chatrelay started, press Ctrl+C or send SIGTERM/SIGINT to shutdown");

    let signal_result = shutdown_coordinator.listen_for_signals().await;
    if let Err(e) = signal_result {
        error!("Error setting up signal handlers: {:#}", e);
    }

    info!("Initiating graceful shutdown...");

    if shutdown_tx.send(()).is_err() {
        warn!("Failed to send shutdown signal to server task");
    }

    if let Err(e) = server_handle.await {
        if !e.is_cancelled() {
            error!("Server task failed: {}", e);
        }
    }

    info!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
