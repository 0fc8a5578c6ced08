//! Chat Relay Library
//!
//! Relays line-delimited JSON account requests from chat clients to the
//! central account server and returns each single-line response to the
//! client that sent the request.

pub mod client;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod relay;
pub mod shutdown;

pub use config::Config;
pub use connection::ConnectionManager;
pub use relay::RelayEngine;
pub use shutdown::ShutdownCoordinator;

/// Common error type for the relay server
pub type Result<T> = anyhow::Result<T>;
