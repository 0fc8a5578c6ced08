//! chatrelay-client - Interactive Chat Client
//!
//! Menu-driven client for account queries and transfers, speaking
//! line-delimited JSON to the chat relay server.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatrelay::client::{run_interactive, ClientSession};
use chatrelay::config::ConfigManager;

/// CLI arguments for the interactive client
#[derive(Parser, Debug)]
#[command(name = "chatrelay-client")]
#[command(about = "Interactive chat client for account queries and transfers")]
#[command(version)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Chat server address (overrides config file)
    #[arg(short, long, help = "Chat server address (e.g., 127.0.0.1:5002)")]
    pub server: Option<String>,

    /// Response timeout in seconds
    #[arg(long, help = "Response timeout in seconds")]
    pub timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", help = "Log level")]
    pub log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    init_tracing(&args)?;

    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    if let Some(server) = args.server.as_deref() {
        config.client.server_addr = server
            .parse()
            .with_context(|| format!("Invalid server address: {}", server))?;
    }

    if let Some(timeout_secs) = args.timeout {
        config.client.response_timeout = Duration::from_secs(timeout_secs);
    }

    let session =
        ClientSession::connect(config.client.server_addr, config.client.response_timeout).await?;

    run_interactive(session).await
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
