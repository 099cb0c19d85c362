//! JSON-RPC session over newline-delimited stdio.
//!
//! A writer task drains an unbounded channel into the server's stdin and a
//! reader task routes responses back to waiting callers by request id.
//! Dropping a request future before its response arrives sends
//! `notifications/cancelled` for that id.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tp_core::config::HarnessConfig;
use tracing::{debug, info, trace, warn};

use crate::launch::server_command;
use crate::mcp::{
    error_codes, methods, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ServerInfo, ToolCall, ToolCallResult,
};
use crate::session::{Session, SessionError};

type Reply = Result<Value, SessionError>;

struct Shared {
    next_id: AtomicU64,
    pending: DashMap<u64, oneshot::Sender<Reply>>,
    outbound: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
}

impl Shared {
    fn send(&self, message: &JsonRpcRequest) -> Result<(), SessionError> {
        let line = serde_json::to_string(message)?;
        trace!(line = %line, "-> server");
        self.outbound.send(line).map_err(|_| SessionError::Closed)
    }

    fn send_response(&self, response: &JsonRpcResponse) {
        match serde_json::to_string(response) {
            Ok(line) => {
                let _ = self.outbound.send(line);
            }
            Err(err) => warn!(error = %err, "failed to encode response to server"),
        }
    }

    /// Reserve an id and a reply slot for a new request.
    ///
    /// `closed` is checked after the insert: `fail_pending` sets the flag
    /// before draining, so a slot inserted once the drain has passed is
    /// removed here instead of waiting out the call timeout.
    fn register(&self) -> Result<(u64, oneshot::Receiver<Reply>), SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        if self.closed.load(Ordering::SeqCst) {
            self.pending.remove(&id);
            return Err(SessionError::Closed);
        }
        Ok((id, rx))
    }

    /// Fail every waiting caller. Called once the read side is gone.
    fn fail_pending(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let ids: Vec<u64> = self.pending.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Err(SessionError::Closed));
            }
        }
    }
}

/// Removes an abandoned request and tells the server to stop working on it.
struct PendingGuard {
    shared: Arc<Shared>,
    id: u64,
    armed: bool,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.shared.pending.remove(&self.id);
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        debug!(request_id = self.id, "cancelling abandoned request");
        let notification = JsonRpcRequest::notification(
            methods::CANCELLED,
            Some(json!({ "requestId": self.id, "reason": "request abandoned by client" })),
        );
        let _ = self.shared.send(&notification);
    }
}

/// A live connection to a tool server speaking MCP over stdio.
pub struct StdioSession {
    shared: Arc<Shared>,
    call_timeout: Duration,
    server_info: OnceLock<ServerInfo>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    child: tokio::sync::Mutex<Option<Child>>,
}

impl std::fmt::Debug for StdioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioSession")
            .field("server_info", &self.server_info.get())
            .field("pending", &self.shared.pending.len())
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl StdioSession {
    /// Launch the configured server and complete the MCP handshake.
    pub async fn connect(config: &HarnessConfig) -> Result<Self, SessionError> {
        let mut command = server_command(config)?;
        let mut child = command
            .spawn()
            .map_err(|e| SessionError::Spawn(format!("{:?}: {e}", command.as_std().get_program())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::Spawn("server stdin not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::Spawn("server stdout not piped".to_string()))?;
        let stderr = child.stderr.take();

        let session = Self::from_streams(stdout, stdin, config.timing.call_timeout());
        if let Some(stderr) = stderr {
            let handle = tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "tp_harness::server", "{line}");
                }
            });
            lock(&session.tasks).push(handle);
        }
        *session.child.lock().await = Some(child);

        session.initialize().await?;
        Ok(session)
    }

    /// Wrap an already-connected byte stream pair. No handshake is sent.
    pub fn from_streams<R, W>(reader: R, writer: W, call_timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
            outbound,
            closed: AtomicBool::new(false),
        });

        let writer_task = tokio::spawn(write_loop(writer, rx));
        let reader_task = tokio::spawn(read_loop(reader, shared.clone()));

        Self {
            shared,
            call_timeout,
            server_info: OnceLock::new(),
            tasks: Mutex::new(vec![writer_task, reader_task]),
            child: tokio::sync::Mutex::new(None),
        }
    }

    /// `initialize` followed by `notifications/initialized`.
    pub async fn initialize(&self) -> Result<InitializeResult, SessionError> {
        let params = serde_json::to_value(InitializeParams::default())?;
        let result: InitializeResult =
            serde_json::from_value(self.request(methods::INITIALIZE, Some(params)).await?)?;
        info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            protocol = %result.protocol_version,
            "connected to tool server"
        );
        let _ = self.server_info.set(result.server_info.clone());
        self.shared
            .send(&JsonRpcRequest::notification(methods::INITIALIZED, None))?;
        Ok(result)
    }

    /// Number of requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.len()
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, SessionError> {
        let (id, rx) = self.shared.register()?;
        let mut guard = PendingGuard {
            shared: self.shared.clone(),
            id,
            armed: true,
        };

        self.shared.send(&JsonRpcRequest::new(id, method, params))?;

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(reply)) => {
                guard.armed = false;
                reply
            }
            Ok(Err(_)) => {
                guard.armed = false;
                Err(SessionError::Closed)
            }
            Err(_) => Err(SessionError::Timeout(self.call_timeout)),
        }
    }
}

#[async_trait]
impl Session for StdioSession {
    async fn list_tools(&self, cursor: Option<String>) -> Result<ListToolsResult, SessionError> {
        let params = cursor.map(|c| json!({ "cursor": c }));
        let value = self.request(methods::TOOLS_LIST, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn call_tool(&self, call: &ToolCall) -> Result<ToolCallResult, SessionError> {
        let params = serde_json::to_value(call)?;
        let value = self.request(methods::TOOLS_CALL, Some(params)).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn server_info(&self) -> Option<ServerInfo> {
        self.server_info.get().cloned()
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.shared.fail_pending();
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        if let Some(mut child) = self.child.lock().await.take() {
            child
                .kill()
                .await
                .map_err(|e| SessionError::Io(e.to_string()))?;
        }
        debug!("stdio session closed");
        Ok(())
    }
}

impl Drop for StdioSession {
    fn drop(&mut self) {
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        if let Err(err) = written {
            warn!(error = %err, "write to server failed");
            break;
        }
    }
}

async fn read_loop<R>(reader: R, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                trace!(line = %line, "<- server");
                dispatch(&shared, &line);
            }
            Ok(None) => {
                debug!("server closed stdout");
                break;
            }
            Err(err) => {
                warn!(error = %err, "read from server failed");
                break;
            }
        }
    }
    shared.fail_pending();
}

fn dispatch(shared: &Shared, line: &str) {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "ignoring non-JSON line from server");
            return;
        }
    };

    // Server-initiated request or notification.
    if let Some(method) = value.get("method").and_then(Value::as_str) {
        let Some(id) = value.get("id").cloned() else {
            debug!(method, "server notification");
            return;
        };
        let response = if method == methods::PING {
            JsonRpcResponse::success(Some(id), json!({}))
        } else {
            JsonRpcResponse::error(
                Some(id),
                error_codes::METHOD_NOT_FOUND,
                format!("client does not handle {method}"),
            )
        };
        shared.send_response(&response);
        return;
    }

    let response: JsonRpcResponse = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(err) => {
            warn!(error = %err, "ignoring malformed response");
            return;
        }
    };
    let Some(id) = response.id.as_ref().and_then(Value::as_u64) else {
        warn!("response without a numeric id");
        return;
    };
    let Some((_, tx)) = shared.pending.remove(&id) else {
        debug!(request_id = id, "response for abandoned request");
        return;
    };

    let reply = match (response.result, response.error) {
        (_, Some(err)) => Err(SessionError::Rpc {
            code: err.code,
            message: err.message,
        }),
        (Some(result), None) => Ok(result),
        (None, None) => Ok(Value::Null),
    };
    let _ = tx.send(reply);
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
