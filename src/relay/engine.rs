//! Relay Engine

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::Result;

/// Forwards single messages to the central server.
///
/// Every message gets its own upstream connection; the response is paired to
/// the request by connection identity alone, so the connection is never
/// reused. It is dropped on every exit path: success, error, or timeout.
pub struct RelayEngine {
    upstream_addr: SocketAddr,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl RelayEngine {
    /// Create a new relay engine with default timeouts
    pub fn new(upstream_addr: SocketAddr) -> Self {
        Self {
            upstream_addr,
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(5),
        }
    }

    /// Create a new relay engine with custom timeouts
    pub fn with_timeouts(
        upstream_addr: SocketAddr,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Self {
        Self {
            upstream_addr,
            connect_timeout,
            response_timeout,
        }
    }

    /// Create a new relay engine from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            upstream_addr: config.upstream.addr,
            connect_timeout: config.upstream.connect_timeout,
            response_timeout: config.upstream.response_timeout,
        }
    }

    /// Get the configured upstream address
    pub fn upstream_addr(&self) -> SocketAddr {
        self.upstream_addr
    }

    /// Forward one message line to the central server and wait for the
    /// single response line.
    ///
    /// The message is treated as opaque text and sent with a newline
    /// appended. The first line received back is the whole response.
    pub async fn forward(&self, message: &str) -> Result<String> {
        let exchange_id = Uuid::new_v4();
        debug!("Exchange {} -> {}: {}", exchange_id, self.upstream_addr, message);

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(self.upstream_addr))
            .await
            .map_err(|_| {
                anyhow!(
                    "connection to central server {} timed out after {:?}",
                    self.upstream_addr,
                    self.connect_timeout
                )
            })?
            .with_context(|| {
                format!("failed to connect to central server {}", self.upstream_addr)
            })?;

        stream
            .write_all(format!("{}\n", message).as_bytes())
            .await
            .context("failed to send message to central server")?;

        let mut reader = BufReader::new(stream);
        let mut response = String::new();
        let bytes_read = timeout(self.response_timeout, reader.read_line(&mut response))
            .await
            .map_err(|_| {
                anyhow!(
                    "central server did not respond within {:?}",
                    self.response_timeout
                )
            })?
            .context("failed to read response from central server")?;

        if bytes_read == 0 {
            bail!("central server closed the connection without responding");
        }

        while response.ends_with('\n') || response.ends_with('\r') {
            response.pop();
        }

        debug!("Exchange {} <- {}: {}", exchange_id, self.upstream_addr, response);
        Ok(response)
    }
}
