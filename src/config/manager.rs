//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(bind_addr) = std::env::var("CHATRELAY_BIND_ADDR") {
            config.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid CHATRELAY_BIND_ADDR: {}", bind_addr))?;
        }

        if let Ok(upstream_addr) = std::env::var("CHATRELAY_UPSTREAM_ADDR") {
            config.upstream.addr = upstream_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid CHATRELAY_UPSTREAM_ADDR: {}", upstream_addr))?;
        }

        if let Ok(max_conn) = std::env::var("CHATRELAY_MAX_CONNECTIONS") {
            config.server.max_connections = max_conn
                .parse::<usize>()
                .with_context(|| format!("Invalid CHATRELAY_MAX_CONNECTIONS: {}", max_conn))?;
        }

        if let Ok(connect_timeout) = std::env::var("CHATRELAY_CONNECT_TIMEOUT") {
            config.upstream.connect_timeout = humantime::parse_duration(&connect_timeout)
                .with_context(|| format!("Invalid CHATRELAY_CONNECT_TIMEOUT: {}", connect_timeout))?;
        }

        if let Ok(response_timeout) = std::env::var("CHATRELAY_RESPONSE_TIMEOUT") {
            config.upstream.response_timeout = humantime::parse_duration(&response_timeout)
                .with_context(|| {
                    format!("Invalid CHATRELAY_RESPONSE_TIMEOUT: {}", response_timeout)
                })?;
        }

        if let Ok(server_addr) = std::env::var("CHATRELAY_SERVER_ADDR") {
            config.client.server_addr = server_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid CHATRELAY_SERVER_ADDR: {}", server_addr))?;
        }

        if let Ok(log_level) = std::env::var("CHATRELAY_LOG_LEVEL") {
            config.monitoring.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_upstream_config()
            .with_context(|| "Upstream configuration validation failed")?;

        self.validate_client_config()
            .with_context(|| "Client configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    /// Validate server configuration
    fn validate_server_config(&self) -> Result<()> {
        if self.server.max_connections == 0 {
            bail!("max_connections must be greater than 0");
        }

        if self.server.max_connections > 100000 {
            bail!("max_connections cannot exceed 100,000 for safety");
        }

        if self.server.shutdown_timeout.as_secs() == 0 {
            bail!("shutdown_timeout must be greater than 0");
        }

        Ok(())
    }

    /// Validate upstream configuration
    fn validate_upstream_config(&self) -> Result<()> {
        if self.upstream.addr == self.server.bind_addr {
            bail!("upstream.addr must differ from server.bind_addr (relay would forward to itself)");
        }

        if self.upstream.connect_timeout.as_millis() == 0 {
            bail!("upstream.connect_timeout must be greater than 0");
        }

        if self.upstream.connect_timeout.as_secs() > 3600 {
            bail!("upstream.connect_timeout cannot exceed 1 hour");
        }

        if self.upstream.response_timeout.as_millis() == 0 {
            bail!("upstream.response_timeout must be greater than 0");
        }

        if self.upstream.response_timeout.as_secs() > 3600 {
            bail!("upstream.response_timeout cannot exceed 1 hour");
        }

        Ok(())
    }

    /// Validate client configuration
    fn validate_client_config(&self) -> Result<()> {
        if self.client.response_timeout.as_millis() == 0 {
            bail!("client.response_timeout must be greater than 0");
        }

        Ok(())
    }

    /// Validate monitoring configuration
    fn validate_monitoring_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!(
                "monitoring.log_level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        port: Option<u16>,
        upstream: Option<&str>,
        max_connections: Option<usize>,
        timeout: Option<u64>,
    ) {
        if let Some(bind_str) = bind {
            if let Ok(addr) = bind_str.parse::<SocketAddr>() {
                self.server.bind_addr = addr;
                tracing::info!("CLI override: bind address set to {}", addr);
            } else {
                tracing::warn!("Invalid bind address provided: {}", bind_str);
            }
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(upstream_str) = upstream {
            if let Ok(addr) = upstream_str.parse::<SocketAddr>() {
                self.upstream.addr = addr;
                tracing::info!("CLI override: upstream address set to {}", addr);
            } else {
                tracing::warn!("Invalid upstream address provided: {}", upstream_str);
            }
        }

        if let Some(max_conn) = max_connections {
            self.server.max_connections = max_conn;
            tracing::info!("CLI override: max connections set to {}", max_conn);
        }

        if let Some(timeout_secs) = timeout {
            self.upstream.response_timeout = std::time::Duration::from_secs(timeout_secs);
            tracing::info!("CLI override: upstream response timeout set to {}s", timeout_secs);
        }
    }
}
