#![cfg(feature = "e2e")]

use serde::Deserialize;
use tp_e2e::e2e;
use tp_harness::tools::pull_requests::{self, MergeMethod, ReviewEvent};
use tp_harness::TestContext;

#[derive(Debug, Deserialize)]
struct Ref {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    head: Ref,
    base: Ref,
}

#[derive(Debug, Deserialize)]
struct Review {
    state: String,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MergeResult {
    merged: bool,
    #[serde(default)]
    sha: String,
}

/// Repository with a `feature-branch` one commit ahead of `main`.
async fn repo_with_feature_branch(ctx: &TestContext, prefix: &str) -> tp_harness::Result<String> {
    let name = ctx.create_repository(prefix).await?;
    ctx.create_branch(&name, "feature-branch").await?;
    ctx.create_file(&name, "feature-branch", "feature.txt", "Feature content", "Add feature")
        .await?;
    Ok(name)
}

#[tokio::test(flavor = "multi_thread")]
async fn create_and_get_pull_request() {
    e2e("create_pull_request", |ctx| async move {
        ctx.skip_unless_available(pull_requests::CREATE_PULL_REQUEST).await?;
        ctx.skip_unless_available(pull_requests::GET_PULL_REQUEST).await?;
        let repo = repo_with_feature_branch(&ctx, "pr-test").await?;

        ctx.step("Creating pull request");
        let created: PullRequest = ctx
            .call(pull_requests::create_pull_request(
                ctx.owner(),
                &repo,
                "Test Pull Request",
                "This is a test PR for E2E testing",
                "feature-branch",
                "main",
            ))
            .await?
            .decode_json()?;
        assert_eq!(created.title, "Test Pull Request");
        assert_eq!(created.state, "open");
        assert_eq!(created.head.name, "feature-branch");
        assert_eq!(created.base.name, "main");

        let fetched: PullRequest = ctx
            .call(pull_requests::get_pull_request(ctx.owner(), &repo, created.number))
            .await?
            .decode_json()?;
        assert_eq!(fetched.number, created.number);
        assert_eq!(fetched.title, created.title);
        assert_eq!(fetched.body.as_deref(), Some("This is a test PR for E2E testing"));
        ctx.result("Pull request round trip verified");
        Ok(())
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn list_pull_requests_includes_open_pr() {
    e2e("list_pull_requests", |ctx| async move {
        ctx.skip_unless_available(pull_requests::LIST_PULL_REQUESTS).await?;
        let repo = repo_with_feature_branch(&ctx, "pr-list-test").await?;
        let number = ctx
            .create_pull_request(&repo, "List me", "Listed PR", "feature-branch", "main")
            .await?;

        let listed: Vec<PullRequest> = ctx
            .call(pull_requests::list_pull_requests(ctx.owner(), &repo, Some("open")))
            .await?
            .decode_json()?;
        assert!(listed.iter().any(|pr| pr.number == number));
        Ok(())
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn update_pull_request_title_and_body() {
    e2e("update_pull_request", |ctx| async move {
        ctx.skip_unless_available(pull_requests::UPDATE_PULL_REQUEST).await?;
        let repo = repo_with_feature_branch(&ctx, "pr-update-test").await?;
        let number = ctx
            .create_pull_request(&repo, "Original Title", "Original body", "feature-branch", "main")
            .await?;

        let updated: PullRequest = ctx
            .call(
                pull_requests::update_pull_request(ctx.owner(), &repo, number)
                    .title("Updated Title")
                    .body("Updated body"),
            )
            .await?
            .decode_json()?;
        assert_eq!(updated.number, number);
        assert_eq!(updated.title, "Updated Title");
        assert_eq!(updated.body.as_deref(), Some("Updated body"));
        Ok(())
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn review_and_list_reviews() {
    e2e("pull_request_reviews", |ctx| async move {
        ctx.skip_unless_available(pull_requests::CREATE_PULL_REQUEST_REVIEW).await?;
        ctx.skip_unless_available(pull_requests::GET_PULL_REQUEST_REVIEWS).await?;
        let repo = repo_with_feature_branch(&ctx, "pr-review-test").await?;
        let number = ctx
            .create_pull_request(&repo, "Review me", "Needs review", "feature-branch", "main")
            .await?;

        // Authors cannot approve their own pull requests; a comment review is
        // the only verdict the test account can leave.
        let review: Review = ctx
            .call(pull_requests::create_pull_request_review(
                ctx.owner(),
                &repo,
                number,
                ReviewEvent::Comment,
                "Looks reasonable",
            ))
            .await?
            .decode_json()?;
        assert_eq!(review.state, "COMMENTED");

        let reviews: Vec<Review> = ctx
            .call(pull_requests::get_pull_request_reviews(ctx.owner(), &repo, number))
            .await?
            .decode_json()?;
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].body.as_deref(), Some("Looks reasonable"));
        Ok(())
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn merge_pull_request_closes_it() {
    e2e("merge_pull_request", |ctx| async move {
        ctx.skip_unless_available(pull_requests::MERGE_PULL_REQUEST).await?;
        let repo = repo_with_feature_branch(&ctx, "pr-merge-test").await?;
        let number = ctx
            .create_pull_request(&repo, "Merge me", "Ready to merge", "feature-branch", "main")
            .await?;

        let merged: MergeResult = ctx
            .call(pull_requests::merge_pull_request(
                ctx.owner(),
                &repo,
                number,
                MergeMethod::Squash,
            ))
            .await?
            .decode_json()?;
        assert!(merged.merged);
        assert!(!merged.sha.is_empty());

        let after: PullRequest = ctx
            .call(pull_requests::get_pull_request(ctx.owner(), &repo, number))
            .await?
            .decode_json()?;
        assert_eq!(after.state, "closed");
        Ok(())
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn get_invalid_pull_request_is_an_error() {
    e2e("invalid_pull_request", |ctx| async move {
        ctx.skip_unless_available(pull_requests::GET_PULL_REQUEST).await?;
        let repo = ctx.create_repository("pr-invalid-test").await?;

        ctx.call_expecting_error(pull_requests::get_pull_request(ctx.owner(), &repo, 99999))
            .await?;
        Ok(())
    })
    .await;
}
