use std::time::Duration;

use crate::session::SessionError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors that end the current test.
///
/// Every variant is fatal to the test that produced it and to nothing else.
/// Two variants are not failures: [`HarnessError::Skipped`] becomes a skipped
/// outcome, and [`HarnessError::Teardown`] is only ever logged.
///
/// # Examples
///
/// ```rust
/// use tp_harness::HarnessError;
///
/// fn classify(err: &HarnessError) -> &'static str {
///     match err {
///         HarnessError::Skipped { .. } => "skipped",
///         HarnessError::Transport { .. } => "server unreachable",
///         HarnessError::ToolReported { .. } => "tool failed",
///         _ => "failed",
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The round trip to the tool server failed (connection, protocol).
    ///
    /// Never retried: it means the server under test is unreachable or
    /// broken.
    #[error("expected to call '{tool}' tool successfully: {source}")]
    Transport {
        tool: String,
        #[source]
        source: SessionError,
    },

    /// The server executed the call and flagged the result as an error while
    /// the caller expected success.
    #[error("expected '{tool}' result not to be an error: {message}")]
    ToolReported { tool: String, message: String },

    /// The caller expected an error result and the tool succeeded.
    #[error("expected '{tool}' result to be an error")]
    UnexpectedSuccess { tool: String },

    /// The response did not match the expected structure.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A cleanup action failed. Logged, never escalated.
    #[error("teardown of {resource} failed: {message}")]
    Teardown { resource: String, message: String },

    /// A deadline race was lost.
    #[error("{operation} operation timed out after {deadline:?}")]
    Timeout {
        operation: String,
        deadline: Duration,
    },

    /// The tool the test needs is not exposed by the server.
    #[error("tool '{tool}' is not available in current toolset")]
    Skipped { tool: String },

    /// An escalating load batch exceeded its allowance.
    #[error("expected batch of {size} operations to complete within {allowance:?}, took {elapsed:?}")]
    BatchTooSlow {
        size: usize,
        elapsed: Duration,
        allowance: Duration,
    },

    /// A concurrent load worker failed one of its operations.
    #[error("worker {worker} failed on operation {operation}: {source}")]
    Worker {
        worker: usize,
        operation: usize,
        #[source]
        source: Box<HarnessError>,
    },

    /// A concurrent load worker panicked.
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    /// A harness-level assertion on a response or report failed.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// The configuration failed validation while a context was built.
    #[error(transparent)]
    Config(#[from] tp_core::config::ConfigError),
}

impl HarnessError {
    pub fn is_skip(&self) -> bool {
        matches!(self, HarnessError::Skipped { .. })
    }

    /// The underlying error of a worker failure, otherwise `self`.
    pub fn root(&self) -> &HarnessError {
        match self {
            HarnessError::Worker { source, .. } => source.root(),
            other => other,
        }
    }
}

/// The response shape did not match what the caller asked for.
///
/// Treated as a contract violation between harness and server.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("expected content to have {expected} item(s), got {actual}")]
    ContentCount { expected: usize, actual: usize },

    #[error("expected content item {index} to be of type {expected}, got {actual}")]
    ContentKind {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("embedded resource is missing `{0}`")]
    MissingField(String),

    #[error("expected to unmarshal JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
