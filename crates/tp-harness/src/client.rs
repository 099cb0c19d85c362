use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::capability::CapabilitySet;
use crate::error::{HarnessError, Result};
use crate::mcp::{ToolCall, ToolCallResult};
use crate::session::{Session, SessionError};

/// Request/response wrapper over a [`Session`] that enforces the caller's
/// success or error expectation on every call.
///
/// No retries and no backoff: a transport failure is returned at once as
/// [`HarnessError::Transport`].
#[derive(Clone)]
pub struct ToolClient {
    session: Arc<dyn Session>,
}

impl std::fmt::Debug for ToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolClient")
            .field("server", &self.session.server_info().map(|s| s.name))
            .finish()
    }
}

impl ToolClient {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Call a tool that is expected to succeed.
    pub async fn call(&self, call: impl Into<ToolCall>) -> Result<ToolCallResult> {
        let call = call.into();
        let result = self.invoke(&call).await?;
        if result.is_error {
            return Err(HarnessError::ToolReported {
                tool: call.name,
                message: result.joined_text(),
            });
        }
        Ok(result)
    }

    /// Call a tool that is expected to report an error.
    pub async fn call_expecting_error(&self, call: impl Into<ToolCall>) -> Result<ToolCallResult> {
        let call = call.into();
        let result = self.invoke(&call).await?;
        if !result.is_error {
            return Err(HarnessError::UnexpectedSuccess { tool: call.name });
        }
        debug!(tool = %call.name, message = %result.joined_text(), "tool reported expected error");
        Ok(result)
    }

    async fn invoke(&self, call: &ToolCall) -> Result<ToolCallResult> {
        let started = Instant::now();
        let outcome = self.session.call_tool(call).await;
        let elapsed = started.elapsed();
        match outcome {
            Ok(result) => {
                debug!(
                    tool = %call.name,
                    is_error = result.is_error,
                    items = result.content.len(),
                    ?elapsed,
                    "tool call completed"
                );
                Ok(result)
            }
            Err(source) => Err(HarnessError::Transport {
                tool: call.name.clone(),
                source,
            }),
        }
    }

    /// List the tools the server currently exposes.
    ///
    /// One round trip per page, never cached, so the answer reflects the
    /// server's present toolset configuration.
    pub async fn list_available(&self) -> Result<CapabilitySet> {
        let mut names = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let page = self
                .session
                .list_tools(cursor.clone())
                .await
                .map_err(|source| HarnessError::Transport {
                    tool: "tools/list".to_string(),
                    source,
                })?;
            names.extend(page.tools.into_iter().map(|t| t.name));

            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if !seen_cursors.insert(next.clone()) {
                        return Err(HarnessError::Transport {
                            tool: "tools/list".to_string(),
                            source: SessionError::Protocol(format!(
                                "pagination cursor `{next}` repeated"
                            )),
                        });
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        let set: CapabilitySet = names.into_iter().collect();
        debug!(count = set.len(), "listed available tools");
        Ok(set)
    }

    pub async fn is_available(&self, name: &str) -> Result<bool> {
        Ok(self.list_available().await?.contains(name))
    }

    /// `Ok(())` when `name` is exposed, otherwise [`HarnessError::Skipped`].
    ///
    /// The tool itself is never invoked.
    pub async fn skip_unless_available(&self, name: &str) -> Result<()> {
        if self.is_available(name).await? {
            Ok(())
        } else {
            info!(tool = name, "skipping: tool not available in current toolset");
            Err(HarnessError::Skipped {
                tool: name.to_string(),
            })
        }
    }
}
