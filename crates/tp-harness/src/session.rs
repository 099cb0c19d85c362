//! The seam between the harness and a live server connection.

use std::time::Duration;

use async_trait::async_trait;

use crate::mcp::{ListToolsResult, ServerInfo, ToolCall, ToolCallResult};

/// Errors raised by a session transport.
///
/// Any of these surfaces as [`crate::HarnessError::Transport`] once it
/// crosses the client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("failed to start server: {0}")]
    Spawn(String),
    #[error("io: {0}")]
    Io(String),
    #[error("session closed")]
    Closed,
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("json-rpc error {code}: {message}")]
    Rpc { code: i32, message: String },
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Protocol(err.to_string())
    }
}

/// A live connection to the tool server.
///
/// Methods take `&self` so one session can be shared read-only across the
/// concurrent workers of a single test.
#[async_trait]
pub trait Session: Send + Sync {
    /// One `tools/list` page.
    async fn list_tools(&self, cursor: Option<String>) -> Result<ListToolsResult, SessionError>;

    /// One `tools/call` round trip.
    async fn call_tool(&self, call: &ToolCall) -> Result<ToolCallResult, SessionError>;

    /// What the server reported during the handshake, if anything.
    fn server_info(&self) -> Option<ServerInfo> {
        None
    }

    /// Shut the connection down. Further calls fail with
    /// [`SessionError::Closed`].
    async fn close(&self) -> Result<(), SessionError> {
        Ok(())
    }
}
