//! Per-test context and the scope that guarantees teardown.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tp_harness::scope::TestContext;
//! use tp_harness::tools::repos;
//!
//! # async fn example(ctx: Arc<TestContext>) {
//! let outcome = TestContext::run(ctx, |ctx| async move {
//!     ctx.skip_unless_available(repos::GET_REPOSITORY).await?;
//!     let repo = ctx.create_repository("get-repo-test").await?;
//!     ctx.call(repos::get_repository(ctx.owner(), &repo)).await?;
//!     Ok(())
//! })
//! .await;
//! outcome.assert_not_failed();
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tp_core::config::HarnessConfig;
use tracing::{info, warn};

use crate::capability::CapabilitySet;
use crate::client::ToolClient;
use crate::error::{HarnessError, Result};
use crate::lifecycle::{
    unique_name, Clock, RepositoryReaper, ResourceId, ResourceKind, ResourceTracker, SystemClock,
    TeardownAction, TrackedResource,
};
use crate::mcp::{ToolCall, ToolCallResult};
use crate::pacing::Pacer;
use crate::session::Session;
use crate::tools::{context, issues, pull_requests, repos};

// ---------------------------------------------------------------------------
// TestContext
// ---------------------------------------------------------------------------

/// Everything one test needs: the session, the resolved owner identity, the
/// suite configuration and the resource tracker.
///
/// Shared read-only across that test's load workers via `Arc`. The tracker
/// belongs to this context alone.
pub struct TestContext {
    name: String,
    owner: String,
    config: Arc<HarnessConfig>,
    client: ToolClient,
    clock: Arc<dyn Clock>,
    reaper: Arc<dyn RepositoryReaper>,
    pacer: Pacer,
    tracker: ResourceTracker,
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct Identity {
    login: String,
}

#[derive(Deserialize)]
struct Numbered {
    number: u64,
}

pub struct TestContextBuilder {
    name: String,
    config: Arc<HarnessConfig>,
    session: Arc<dyn Session>,
    reaper: Arc<dyn RepositoryReaper>,
    clock: Option<Arc<dyn Clock>>,
    pacer: Option<Pacer>,
}

impl TestContextBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the configured inter-call delay.
    pub fn pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Validate the configuration, resolve the owner identity through
    /// `get_me` and build the context.
    pub async fn build(self) -> Result<Arc<TestContext>> {
        self.config.validate()?;
        let client = ToolClient::new(self.session);
        let identity: Identity = client.call(context::get_me()).await?.decode_json()?;
        info!(test = %self.name, owner = %identity.login, "test context ready");

        Ok(Arc::new(TestContext {
            pacer: self
                .pacer
                .unwrap_or_else(|| Pacer::from_config(&self.config.timing)),
            name: self.name,
            owner: identity.login,
            config: self.config,
            client,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock::default())),
            reaper: self.reaper,
            tracker: ResourceTracker::new(),
        }))
    }
}

impl TestContext {
    pub fn builder(
        name: impl Into<String>,
        config: Arc<HarnessConfig>,
        session: Arc<dyn Session>,
        reaper: Arc<dyn RepositoryReaper>,
    ) -> TestContextBuilder {
        TestContextBuilder {
            name: name.into(),
            config,
            session,
            reaper,
            clock: None,
            pacer: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Login of the authenticated identity, resolved once at build time.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn client(&self) -> &ToolClient {
        &self.client
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn pacer(&self) -> Pacer {
        self.pacer
    }

    // -- invocation ---------------------------------------------------------

    pub async fn call(&self, call: impl Into<ToolCall>) -> Result<ToolCallResult> {
        self.client.call(call).await
    }

    pub async fn call_expecting_error(&self, call: impl Into<ToolCall>) -> Result<ToolCallResult> {
        self.client.call_expecting_error(call).await
    }

    // -- capability probing -------------------------------------------------

    pub async fn list_available(&self) -> Result<CapabilitySet> {
        self.client.list_available().await
    }

    pub async fn is_available(&self, name: &str) -> Result<bool> {
        self.client.is_available(name).await
    }

    pub async fn skip_unless_available(&self, name: &str) -> Result<()> {
        self.client.skip_unless_available(name).await
    }

    // -- pacing and logging -------------------------------------------------

    /// Fixed delay between calls, for tests that hammer the provider.
    pub async fn wait_for_rate_limit(&self) {
        self.pacer.wait().await;
    }

    pub fn step(&self, step: &str) {
        info!(test = %self.name, "🔄 {step}");
    }

    pub fn result(&self, result: &str) {
        info!(test = %self.name, "✅ {result}");
    }

    pub fn unique_name(&self, prefix: &str) -> String {
        unique_name(self.clock.as_ref(), prefix)
    }

    // -- resource lifecycle -------------------------------------------------

    /// Create a private, auto-initialized repository named
    /// `<repo_name_prefix>-<prefix>-<stamp>` and schedule its deletion.
    pub async fn create_repository(&self, prefix: &str) -> Result<String> {
        let name = self.unique_name(&format!(
            "{}-{}",
            self.config.resources.repo_name_prefix, prefix
        ));
        self.call(repos::create_repository(name.as_str())).await?;

        self.tracker.record(TrackedResource::repository(&name));
        self.register_repository_teardown(&name);
        Ok(name)
    }

    /// Schedule deletion of a repository created outside
    /// [`TestContext::create_repository`].
    pub fn register_repository_teardown(&self, name: &str) {
        let reaper = self.reaper.clone();
        let owner = self.owner.clone();
        let repo = name.to_string();
        self.tracker.register_teardown(TeardownAction::new(
            format!("delete repository {owner}/{repo}"),
            async move { reaper.delete_repository(&owner, &repo).await },
        ));
    }

    /// Branch off the configured base branch.
    pub async fn create_branch(&self, repo: &str, branch: &str) -> Result<()> {
        self.call(repos::create_branch(
            &self.owner,
            repo,
            branch,
            &self.config.resources.base_branch,
        ))
        .await?;
        self.tracker.record(TrackedResource::child(
            ResourceKind::Branch,
            repo,
            ResourceId::Name(branch.to_string()),
        ));
        Ok(())
    }

    pub async fn create_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<()> {
        self.call(repos::create_or_update_file(
            &self.owner,
            repo,
            branch,
            path,
            content,
            message,
        ))
        .await?;
        self.tracker.record(TrackedResource::child(
            ResourceKind::File,
            repo,
            ResourceId::Name(format!("{branch}:{path}")),
        ));
        Ok(())
    }

    pub async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<u64> {
        let pr: Numbered = self
            .call(pull_requests::create_pull_request(
                &self.owner,
                repo,
                title,
                body,
                head,
                base,
            ))
            .await?
            .decode_json()?;
        self.tracker.record(TrackedResource::child(
            ResourceKind::PullRequest,
            repo,
            ResourceId::Number(pr.number),
        ));
        Ok(pr.number)
    }

    pub async fn create_issue(&self, repo: &str, title: &str) -> Result<u64> {
        let issue: Numbered = self
            .call(issues::create_issue(&self.owner, repo, title, None))
            .await?
            .decode_json()?;
        self.tracker.record(TrackedResource::child(
            ResourceKind::Issue,
            repo,
            ResourceId::Number(issue.number),
        ));
        Ok(issue.number)
    }

    /// Register an arbitrary cleanup action.
    pub fn defer<F>(&self, label: impl Into<String>, action: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tracker
            .register_teardown(TeardownAction::new(label, action));
    }

    pub fn resources(&self) -> Vec<TrackedResource> {
        self.tracker.resources()
    }

    /// Run the teardown list now. [`TestContext::run`] calls this on every
    /// exit path; calling it again is a no-op.
    pub async fn teardown(&self) -> Vec<String> {
        self.tracker
            .run_teardown(self.config.timing.call_timeout())
            .await
    }

    // -- scope --------------------------------------------------------------

    /// Run `body` and then teardown, whatever the body's outcome.
    ///
    /// The body runs on its own task so a panic is caught and reported as a
    /// failure after teardown has still run.
    pub async fn run<F, Fut>(ctx: Arc<TestContext>, body: F) -> TestOutcome
    where
        F: FnOnce(Arc<TestContext>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        info!(test = %ctx.name, "test started");
        let status = match tokio::spawn(body(ctx.clone())).await {
            Ok(Ok(())) => TestStatus::Passed,
            Ok(Err(err)) => match err.root() {
                HarnessError::Skipped { tool } => TestStatus::Skipped {
                    reason: format!("Tool '{tool}' is not available in current toolset"),
                },
                _ => TestStatus::Failed {
                    message: err.to_string(),
                },
            },
            Err(join_err) => TestStatus::Failed {
                message: panic_message(join_err),
            },
        };

        let teardown_warnings = ctx.teardown().await;
        let outcome = TestOutcome {
            name: ctx.name.clone(),
            status,
            teardown_warnings,
            resources: ctx.resources(),
        };
        outcome.log();
        outcome
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return format!("test body cancelled: {err}");
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("test body panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("test body panicked: {s}")
    } else {
        "test body panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// TestOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Skipped { reason: String },
    Failed { message: String },
}

/// What happened to one test, teardown diagnostics included.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub name: String,
    pub status: TestStatus,
    /// Teardown failures. Side channel only; never part of `status`.
    pub teardown_warnings: Vec<String>,
    pub resources: Vec<TrackedResource>,
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        self.status == TestStatus::Passed
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, TestStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TestStatus::Failed { .. })
    }

    /// Panic when the test failed. Skips and passes return normally.
    pub fn assert_not_failed(&self) {
        if let TestStatus::Failed { message } = &self.status {
            panic!("test `{}` failed: {message}", self.name);
        }
    }

    fn log(&self) {
        for warning in &self.teardown_warnings {
            warn!(test = %self.name, warning = %warning, "teardown warning");
        }
        match &self.status {
            TestStatus::Passed => info!(test = %self.name, "test passed"),
            TestStatus::Skipped { reason } => info!(test = %self.name, reason = %reason, "test skipped"),
            TestStatus::Failed { message } => warn!(test = %self.name, error = %message, "test failed"),
        }
    }
}
