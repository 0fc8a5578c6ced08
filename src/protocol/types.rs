//! Wire Protocol Types
//!
//! The relay itself never parses these shapes; it forwards each line as
//! opaque text. They are built by the interactive client and, in the error
//! case, by the relay when the upstream exchange fails.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Account-related requests sent by the chat client.
///
/// Serialized as an internally tagged JSON object, one per line. The tag and
/// field order are part of the wire contract with the central server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Ask the central server for the details of one account.
    #[serde(rename = "CONSULTAR_CUENTA")]
    AccountQuery { account: i64 },

    /// Ask the central server to move `amount` from one account to another.
    #[serde(rename = "TRANSFERIR_CUENTA")]
    Transfer { from: i64, to: i64, amount: f64 },
}

impl Request {
    /// Create an account query request
    pub fn account_query(account: i64) -> Self {
        Self::AccountQuery { account }
    }

    /// Create a transfer request
    pub fn transfer(from: i64, to: i64, amount: f64) -> Self {
        Self::Transfer { from, to, amount }
    }

    /// Encode as a single wire line, without the trailing newline
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Error line the relay writes back to a client when the upstream exchange
/// fails. This is the only JSON the relay produces itself; everything else
/// on the wire is relayed verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "ERROR")]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// Create an error response with the given reason
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Encode as a single wire line, without the trailing newline
    pub fn to_line(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"ERROR","error":"internal error"}"#.to_string())
    }
}
