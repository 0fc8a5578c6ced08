//! Message Relay Module
//!
//! Forwards client messages to the central server, one dedicated upstream
//! connection per message.

pub mod engine;

pub use engine::RelayEngine;
