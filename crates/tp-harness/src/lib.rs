//! Black-box test machinery for a remote tool-invocation (MCP)
//! server.
//!
//! This crate sits between test bodies and a live server session. It
//! coordinates:
//! - Session abstraction over the JSON-RPC transport (stdio child process or
//!   an in-memory scripted server)
//! - Tool invocation with success/error expectations and response decoding
//! - Capability probing, so optional toolsets skip rather than fail
//! - Remote resource lifecycle tracking with guaranteed best-effort teardown
//! - Load generation: concurrent workers, deadlines, escalating batches

pub mod capability;
pub mod client;
pub mod decode;
pub mod error;
pub mod launch;
pub mod lifecycle;
pub mod load;
pub mod mcp;
pub mod pacing;
pub mod scope;
pub mod scripted;
pub mod session;
pub mod stdio;
pub mod tools;

pub use capability::CapabilitySet;
pub use client::ToolClient;
pub use error::{DecodeError, HarnessError, Result};
pub use mcp::{ContentItem, ToolCall, ToolCallResult};
pub use scope::{TestContext, TestOutcome, TestStatus};
pub use session::{Session, SessionError};
