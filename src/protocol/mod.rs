//! Wire Protocol Module
//!
//! Line-delimited JSON messages exchanged between the chat client, the relay
//! server, and the central account server.

pub mod types;

pub use types::{ErrorResponse, Request};
