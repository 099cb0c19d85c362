//! Typed argument builders, one module per tool family.
//!
//! The wire surface is an open-ended string-keyed map, but every call site
//! goes through these constructors so argument names are spelled in exactly
//! one place.

pub mod context;
pub mod issues;
pub mod pull_requests;
pub mod repos;

use crate::mcp::ToolCall;

/// `owner` and `repo`, the prefix shared by every repository-scoped tool.
pub(crate) fn repo_call(name: &str, owner: &str, repo: &str) -> ToolCall {
    ToolCall::new(name).arg("owner", owner).arg("repo", repo)
}
