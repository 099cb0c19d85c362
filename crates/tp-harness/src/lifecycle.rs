//! Remote resource bookkeeping and deferred teardown.
//!
//! Every resource a test creates is recorded in a ledger. Only repositories
//! register a teardown action: branches, files, issues and pull requests go
//! away with the repository that owns them.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::HarnessError;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

// ---------------------------------------------------------------------------
// Tracked resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Repository,
    Branch,
    File,
    Issue,
    PullRequest,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Repository => "repository",
            ResourceKind::Branch => "branch",
            ResourceKind::File => "file",
            ResourceKind::Issue => "issue",
            ResourceKind::PullRequest => "pull request",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Name(String),
    Number(u64),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Name(name) => f.write_str(name),
            ResourceId::Number(n) => write!(f, "#{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedResource {
    pub kind: ResourceKind,
    pub id: ResourceId,
    /// Owning repository for everything except repositories themselves.
    pub parent_repository: Option<String>,
}

impl TrackedResource {
    pub fn repository(name: &str) -> Self {
        Self {
            kind: ResourceKind::Repository,
            id: ResourceId::Name(name.to_string()),
            parent_repository: None,
        }
    }

    pub fn child(kind: ResourceKind, repo: &str, id: ResourceId) -> Self {
        Self {
            kind,
            id,
            parent_repository: Some(repo.to_string()),
        }
    }
}

impl fmt::Display for TrackedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent_repository {
            Some(repo) => write!(f, "{} {} in {}", self.kind, self.id, repo),
            None => write!(f, "{} {}", self.kind, self.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Seams: repository deletion and time
// ---------------------------------------------------------------------------

/// Deletes repositories out of band, through the provider rather than the
/// server under test.
#[async_trait]
pub trait RepositoryReaper: Send + Sync {
    async fn delete_repository(&self, owner: &str, name: &str) -> Result<(), HarnessError>;
}

/// Source of the current time and of unique name suffixes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Strictly increasing within the process.
    fn unique_stamp(&self) -> i64;
}

/// Wall clock with microsecond stamps.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn unique_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// `<prefix>-<stamp>`.
pub fn unique_name(clock: &dyn Clock, prefix: &str) -> String {
    format!("{}-{}", prefix, clock.unique_stamp())
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

/// A deferred cleanup operation. Lazy: nothing runs until teardown polls it.
pub struct TeardownAction {
    label: String,
    action: BoxFuture<Result<(), HarnessError>>,
}

impl TeardownAction {
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Box::pin(action),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for TeardownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeardownAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Ledger plus teardown list for one test. Never shared between tests.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    ledger: Mutex<Vec<TrackedResource>>,
    teardown: Mutex<Vec<TeardownAction>>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, resource: TrackedResource) {
        debug!(resource = %resource, "tracking resource");
        lock(&self.ledger).push(resource);
    }

    pub fn register_teardown(&self, action: TeardownAction) {
        debug!(label = action.label(), "registered teardown");
        lock(&self.teardown).push(action);
    }

    /// Snapshot of everything created so far, in creation order.
    pub fn resources(&self) -> Vec<TrackedResource> {
        lock(&self.ledger).clone()
    }

    pub fn pending_teardown(&self) -> usize {
        lock(&self.teardown).len()
    }

    /// Run every registered action, most recent first.
    ///
    /// Best effort: a failing or overrunning action is logged as a warning
    /// and the rest still run. Returns the warnings; nothing here changes
    /// the test's pass/fail signal.
    pub async fn run_teardown(&self, per_action_timeout: Duration) -> Vec<String> {
        let actions: Vec<TeardownAction> = std::mem::take(&mut *lock(&self.teardown));
        let mut warnings = Vec::new();

        for action in actions.into_iter().rev() {
            let TeardownAction { label, action } = action;
            let message = match tokio::time::timeout(per_action_timeout, action).await {
                Ok(Ok(())) => {
                    debug!(label = %label, "teardown completed");
                    continue;
                }
                Ok(Err(err)) => err.to_string(),
                Err(_) => format!("timed out after {per_action_timeout:?}"),
            };
            warn!(label = %label, error = %message, "Warning: teardown failed");
            warnings.push(format!("{label}: {message}"));
        }

        warnings
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A poisoned ledger still holds valid entries.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
