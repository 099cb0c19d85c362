use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::{GitHubError, GitHubVerifier, Result};

impl GitHubVerifier {
    /// `false` on 404; any other failure is an error.
    pub async fn repository_exists(&self, owner: &str, name: &str) -> Result<bool> {
        match self.octocrab.repos(owner, name).get().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = GitHubError::from(err);
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    pub async fn delete_repository(&self, owner: &str, name: &str) -> Result<()> {
        self.octocrab.repos(owner, name).delete().await?;
        info!(repo = %format!("{owner}/{name}"), "deleted repository");
        Ok(())
    }

    /// Create an annotated tag on the tip of `branch` and return the tag
    /// object's sha.
    pub async fn create_tag(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        tag: &str,
        message: &str,
    ) -> Result<String> {
        let head: Value = self
            .octocrab
            .get(
                format!("/repos/{owner}/{repo}/git/ref/heads/{branch}"),
                None::<&()>,
            )
            .await?;
        let commit_sha = sha_at(&head, "/object/sha")?;

        let body = json!({
            "tag": tag,
            "message": message,
            "object": commit_sha,
            "type": "commit",
        });
        let tag_object: Value = self
            .octocrab
            .post(format!("/repos/{owner}/{repo}/git/tags"), Some(&body))
            .await?;
        let tag_sha = sha_at(&tag_object, "/sha")?;

        let body = json!({ "ref": format!("refs/tags/{tag}"), "sha": tag_sha });
        let _: Value = self
            .octocrab
            .post(format!("/repos/{owner}/{repo}/git/refs"), Some(&body))
            .await?;

        debug!(repo = %format!("{owner}/{repo}"), tag, sha = %tag_sha, "created tag");
        Ok(tag_sha)
    }
}

fn sha_at(value: &Value, pointer: &str) -> Result<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GitHubError::UnexpectedResponse(format!("missing `{pointer}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha_at_reads_nested_pointer() {
        let head = json!({"ref": "refs/heads/main", "object": {"sha": "abc123", "type": "commit"}});
        assert_eq!(sha_at(&head, "/object/sha").unwrap(), "abc123");
        assert!(matches!(
            sha_at(&head, "/sha"),
            Err(GitHubError::UnexpectedResponse(_))
        ));
    }
}
