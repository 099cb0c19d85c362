//! Suite bootstrap for the live end-to-end tests.
//!
//! Configuration is read from the environment once per test binary. Every
//! test then gets its own server session and context, so tests can run in
//! parallel against the same account.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tp_core::config::HarnessConfig;
use tp_harness::lifecycle::RepositoryReaper;
use tp_harness::stdio::StdioSession;
use tp_harness::{HarnessError, Session, TestContext, TestOutcome, TestStatus};
use tp_integrations::github::GitHubVerifier;
use tracing::warn;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SuiteError {
    #[error("e2e configuration: {0}")]
    Config(String),
    #[error("GitHub verifier: {0}")]
    Verifier(String),
}

#[derive(Debug)]
pub struct Suite {
    config: Arc<HarnessConfig>,
    verifier: Arc<GitHubVerifier>,
}

static SUITE: OnceLock<Result<Suite, SuiteError>> = OnceLock::new();

/// The process-wide suite, built from the environment on first use.
pub fn suite() -> Result<&'static Suite, SuiteError> {
    SUITE
        .get_or_init(|| {
            tp_telemetry::logging::init_test_logging();
            Suite::from_config(
                HarnessConfig::from_env().map_err(|e| SuiteError::Config(e.to_string()))?,
            )
        })
        .as_ref()
        .map_err(Clone::clone)
}

impl Suite {
    pub fn from_config(config: HarnessConfig) -> Result<Self, SuiteError> {
        let verifier =
            GitHubVerifier::new(&config).map_err(|e| SuiteError::Verifier(e.to_string()))?;
        Ok(Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Direct REST access for assertions and out-of-band setup.
    pub fn verifier(&self) -> &GitHubVerifier {
        &self.verifier
    }

    /// Launch a server session and resolve the owner identity.
    pub async fn context(&self, name: &str) -> Result<Arc<TestContext>, HarnessError> {
        let session = StdioSession::connect(&self.config)
            .await
            .map_err(|source| HarnessError::Transport {
                tool: "initialize".to_string(),
                source,
            })?;
        let reaper: Arc<dyn RepositoryReaper> = self.verifier.clone();
        TestContext::builder(name, self.config.clone(), Arc::new(session), reaper)
            .build()
            .await
    }

    /// Run one test body with its own session and guaranteed teardown.
    pub async fn run<F, Fut>(&self, name: &str, body: F) -> TestOutcome
    where
        F: FnOnce(Arc<TestContext>) -> Fut,
        Fut: Future<Output = tp_harness::Result<()>> + Send + 'static,
    {
        let ctx = match self.context(name).await {
            Ok(ctx) => ctx,
            Err(err) => return bootstrap_failure(name, &err),
        };
        let session = ctx.client().session().clone();
        let outcome = TestContext::run(ctx, body).await;
        if let Err(err) = session.close().await {
            warn!(test = name, error = %err, "failed to close session");
        }
        outcome
    }
}

fn bootstrap_failure(name: &str, err: &HarnessError) -> TestOutcome {
    TestOutcome {
        name: name.to_string(),
        status: TestStatus::Failed {
            message: format!("test setup failed: {err}"),
        },
        teardown_warnings: Vec::new(),
        resources: Vec::new(),
    }
}

/// Run `body` under the suite and fail the calling test unless it passed or
/// skipped.
pub async fn e2e<F, Fut>(name: &str, body: F) -> TestOutcome
where
    F: FnOnce(Arc<TestContext>) -> Fut,
    Fut: Future<Output = tp_harness::Result<()>> + Send + 'static,
{
    let outcome = match suite() {
        Ok(suite) => suite.run(name, body).await,
        Err(err) => TestOutcome {
            name: name.to_string(),
            status: TestStatus::Failed {
                message: err.to_string(),
            },
            teardown_warnings: Vec::new(),
            resources: Vec::new(),
        },
    };
    outcome.assert_not_failed();
    outcome
}
