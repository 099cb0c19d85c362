use async_trait::async_trait;
use tp_harness::lifecycle::RepositoryReaper;
use tp_harness::HarnessError;

use super::client::{GitHubError, GitHubVerifier};

#[async_trait]
impl RepositoryReaper for GitHubVerifier {
    async fn delete_repository(&self, owner: &str, name: &str) -> Result<(), HarnessError> {
        GitHubVerifier::delete_repository(self, owner, name)
            .await
            .map_err(|err| teardown_error(owner, name, &err))
    }
}

/// A failed deletion, reported as a teardown warning for `owner/name`.
pub fn teardown_error(owner: &str, name: &str, err: &GitHubError) -> HarnessError {
    HarnessError::Teardown {
        resource: format!("repository {owner}/{name}"),
        message: err.to_string(),
    }
}
