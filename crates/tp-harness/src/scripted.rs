//! In-memory [`Session`] driven by per-tool handler closures.
//!
//! Stands in for a live server in unit and integration tests. Handlers see
//! the full [`ToolCall`] and return whatever envelope the test needs,
//! including tool-reported errors and transport failures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::mcp::{error_codes, ListToolsResult, McpTool, ServerInfo, ToolCall, ToolCallResult};
use crate::session::{Session, SessionError};

type Handler = Arc<dyn Fn(&ToolCall) -> Result<ToolCallResult, SessionError> + Send + Sync>;

pub struct ScriptedSession {
    tools: DashMap<String, Handler>,
    calls: Mutex<Vec<ToolCall>>,
    latency: Duration,
    page_size: Option<usize>,
    list_requests: AtomicUsize,
    abandoned: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ScriptedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedSession")
            .field("tools", &self.tool_names())
            .field("latency", &self.latency)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            page_size: None,
            list_requests: AtomicUsize::new(0),
            abandoned: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_tool<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&ToolCall) -> Result<ToolCallResult, SessionError> + Send + Sync + 'static,
    {
        self.add_tool(name, handler);
        self
    }

    /// Simulated round-trip time for every `tools/call`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Split `tools/list` into pages of `size`.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    pub fn add_tool<F>(&self, name: &str, handler: F)
    where
        F: Fn(&ToolCall) -> Result<ToolCallResult, SessionError> + Send + Sync + 'static,
    {
        self.tools.insert(name.to_string(), Arc::new(handler));
    }

    pub fn remove_tool(&self, name: &str) {
        self.tools.remove(name);
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Every `tools/call` received, in arrival order.
    pub fn calls(&self) -> Vec<ToolCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        lock(&self.calls).iter().filter(|c| c.name == name).count()
    }

    pub fn list_requests(&self) -> usize {
        self.list_requests.load(Ordering::SeqCst)
    }

    /// Calls whose caller dropped the future before the response arrived.
    pub fn abandoned_calls(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

struct AbandonGuard {
    counter: Arc<AtomicUsize>,
    armed: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if self.armed {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn list_tools(&self, cursor: Option<String>) -> Result<ListToolsResult, SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Closed);
        }
        self.list_requests.fetch_add(1, Ordering::SeqCst);

        let names = self.tool_names();
        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| SessionError::Rpc {
                    code: error_codes::INVALID_PARAMS,
                    message: format!("invalid cursor: {c}"),
                })?,
            None => 0,
        };
        let end = match self.page_size {
            Some(size) => (start + size).min(names.len()),
            None => names.len(),
        };

        Ok(ListToolsResult {
            tools: names
                .get(start..end)
                .unwrap_or_default()
                .iter()
                .map(McpTool::named)
                .collect(),
            next_cursor: (end < names.len()).then(|| end.to_string()),
        })
    }

    async fn call_tool(&self, call: &ToolCall) -> Result<ToolCallResult, SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Closed);
        }
        lock(&self.calls).push(call.clone());

        let mut guard = AbandonGuard {
            counter: self.abandoned.clone(),
            armed: true,
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        guard.armed = false;

        let handler = self
            .tools
            .get(&call.name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SessionError::Rpc {
                code: error_codes::METHOD_NOT_FOUND,
                message: format!("unknown tool: {}", call.name),
            })?;
        handler(call)
    }

    fn server_info(&self) -> Option<ServerInfo> {
        Some(ServerInfo {
            name: "scripted".to_string(),
            version: "0.0.0".to_string(),
        })
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
