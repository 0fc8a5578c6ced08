//! Connection Manager Implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Semaphore};
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::protocol::ErrorResponse;
use crate::relay::RelayEngine;
use crate::Result;

/// Manages chat client connections and their lifecycle
pub struct ConnectionManager {
    listener: Option<TcpListener>,
    config: Arc<Config>,
    relay: Arc<RelayEngine>,
    connection_slots: Arc<Semaphore>,
    active_connections: Arc<AtomicUsize>,
    next_connection_id: Arc<AtomicUsize>,
    shutdown_flag: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ConnectionManager {
    /// Create a new ConnectionManager
    pub fn new(config: Arc<Config>) -> Self {
        let relay = Arc::new(RelayEngine::from_config(&config));
        let connection_slots = Arc::new(Semaphore::new(config.server.max_connections));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            listener: None,
            config,
            relay,
            connection_slots,
            active_connections: Arc::new(AtomicUsize::new(0)),
            next_connection_id: Arc::new(AtomicUsize::new(1)),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Bind the TCP listener and return the local address
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        let bind_addr = self.config.server.bind_addr;

        info!("Binding TCP listener to {}", bind_addr);
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;

        let local_addr = listener
            .local_addr()
            .context("Failed to get listener local address")?;
        info!("Successfully bound to {}", local_addr);

        self.listener = Some(listener);
        Ok(local_addr)
    }

    /// Start the connection manager and begin accepting connections
    pub async fn start(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind().await?;
        }

        info!(
            "Relaying to central server at {}",
            self.relay.upstream_addr()
        );

        self.accept_connections().await
    }

    /// Main connection acceptance loop
    async fn accept_connections(&self) -> Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Listener not initialized"))?;

        info!("Starting connection acceptance loop");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            if self.shutdown_flag.load(Ordering::Relaxed) {
                info!("Shutdown flag set, stopping connection acceptance");
                break;
            }

            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            debug!("Accepted connection from {}", addr);

                            if self.shutdown_flag.load(Ordering::Relaxed) {
                                debug!("Rejecting connection from {} due to shutdown", addr);
                                continue;
                            }

                            let slot = match Arc::clone(&self.connection_slots).try_acquire_owned() {
                                Ok(permit) => permit,
                                Err(_) => {
                                    warn!("Connection limit reached, rejecting connection from {}", addr);
                                    continue;
                                }
                            };

                            let connection_id = format!(
                                "conn_{}",
                                self.next_connection_id.fetch_add(1, Ordering::Relaxed)
                            );

                            let relay = Arc::clone(&self.relay);
                            let active_connections = Arc::clone(&self.active_connections);
                            let shutdown_rx = self.shutdown_tx.subscribe();

                            tokio::spawn(async move {
                                // Slot is held for the whole lifetime of the connection
                                let _slot = slot;

                                active_connections.fetch_add(1, Ordering::Relaxed);
                                let start_time = Instant::now();
                                info!("Client {} connected from {}", connection_id, addr);

                                if let Err(e) = Self::handle_client(
                                    stream, addr, relay, connection_id.clone(), shutdown_rx
                                ).await {
                                    error!("Error handling client {}: {:#}", connection_id, e);
                                }

                                info!(
                                    "Client {} from {} disconnected after {:?}",
                                    connection_id, addr, start_time.elapsed()
                                );
                                active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal, stopping connection acceptance");
                    self.shutdown_flag.store(true, Ordering::Relaxed);
                    break;
                }
            }
        }

        info!("Connection acceptance loop stopped");
        Ok(())
    }

    /// Serve one client connection until it disconnects.
    ///
    /// Each received line is one opaque message, relayed through a dedicated
    /// upstream connection. The client connection stays open across
    /// request/response cycles; a failed upstream exchange produces an
    /// explicit error line instead of silence.
    #[instrument(skip(stream, relay, shutdown_rx), fields(connection_id = %connection_id, addr = %addr))]
    async fn handle_client(
        stream: TcpStream,
        addr: SocketAddr,
        relay: Arc<RelayEngine>,
        connection_id: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let message = match line
                        .with_context(|| format!("Failed to read from client {}", addr))?
                    {
                        Some(message) => message,
                        None => {
                            debug!("Client {} closed the connection", addr);
                            break;
                        }
                    };

                    if message.trim().is_empty() {
                        continue;
                    }

                    info!("Received from {}: {}", addr, message.trim_end());

                    let response = match relay.forward(&message).await {
                        Ok(response) => response,
                        Err(e) => {
                            warn!("Upstream exchange failed for client {}: {:#}", addr, e);
                            ErrorResponse::new(format!("{:#}", e)).to_line()
                        }
                    };

                    write_half
                        .write_all(format!("{}\n", response).as_bytes())
                        .await
                        .with_context(|| format!("Failed to write response to client {}", addr))?;
                }
                _ = shutdown_rx.recv() => {
                    info!("Client {} connection closing due to shutdown", connection_id);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Get the number of active connections
    pub fn get_active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Get the bind address if listener is initialized
    pub fn get_bind_addr(&self) -> Option<SocketAddr> {
        self.listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Initiate graceful shutdown
    pub fn initiate_shutdown(&self) {
        info!("Initiating graceful shutdown of connection manager");
        self.shutdown_flag.store(true, Ordering::Relaxed);

        if self.shutdown_tx.send(()).is_err() {
            debug!("No connection handlers listening for shutdown signal");
        }
    }

    /// Get a shutdown receiver for external components
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Check if shutdown has been initiated
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Wait for all connections to close gracefully
    pub async fn wait_for_connections_to_close(&self) -> Result<()> {
        let shutdown_timeout = self.config.server.shutdown_timeout;
        let start_time = Instant::now();

        info!(
            "Waiting for {} active connections to close (timeout: {:?})",
            self.get_active_connections(),
            shutdown_timeout
        );

        while self.get_active_connections() > 0 && start_time.elapsed() < shutdown_timeout {
            debug!(
                "Waiting for {} active connections to close",
                self.get_active_connections()
            );
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let remaining = self.get_active_connections();
        let elapsed = start_time.elapsed();

        if remaining == 0 {
            info!("All connections closed gracefully in {:?}", elapsed);
        } else {
            warn!(
                "Shutdown timeout reached after {:?} with {} connections still active",
                elapsed, remaining
            );
        }

        Ok(())
    }

    /// Gracefully shutdown the connection manager
    pub async fn shutdown(&self) -> Result<()> {
        self.initiate_shutdown();
        self.wait_for_connections_to_close().await
    }
}
