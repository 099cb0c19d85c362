use crate::mcp::ToolCall;

use super::repo_call;

pub const CREATE_PULL_REQUEST: &str = "create_pull_request";
pub const GET_PULL_REQUEST: &str = "get_pull_request";
pub const LIST_PULL_REQUESTS: &str = "list_pull_requests";
pub const UPDATE_PULL_REQUEST: &str = "update_pull_request";
pub const MERGE_PULL_REQUEST: &str = "merge_pull_request";
pub const ADD_PULL_REQUEST_COMMENT: &str = "add_pull_request_comment";
pub const CREATE_PULL_REQUEST_REVIEW: &str = "create_pull_request_review";
pub const GET_PULL_REQUEST_REVIEWS: &str = "get_pull_request_reviews";

/// `create_pull_request`. Responds with the created PR, `number` included.
pub fn create_pull_request(
    owner: &str,
    repo: &str,
    title: &str,
    body: &str,
    head: &str,
    base: &str,
) -> ToolCall {
    repo_call(CREATE_PULL_REQUEST, owner, repo)
        .arg("title", title)
        .arg("body", body)
        .arg("head", head)
        .arg("base", base)
}

pub fn get_pull_request(owner: &str, repo: &str, number: u64) -> ToolCall {
    repo_call(GET_PULL_REQUEST, owner, repo).arg("pullNumber", number)
}

pub fn list_pull_requests(owner: &str, repo: &str, state: Option<&str>) -> ToolCall {
    repo_call(LIST_PULL_REQUESTS, owner, repo).opt_arg("state", state)
}

/// `update_pull_request`; only the fields that were set are sent.
#[derive(Debug, Clone)]
pub struct UpdatePullRequest {
    call: ToolCall,
}

impl UpdatePullRequest {
    pub fn title(mut self, title: &str) -> Self {
        self.call = self.call.arg("title", title);
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.call = self.call.arg("body", body);
        self
    }

    pub fn state(mut self, state: &str) -> Self {
        self.call = self.call.arg("state", state);
        self
    }
}

impl From<UpdatePullRequest> for ToolCall {
    fn from(b: UpdatePullRequest) -> Self {
        b.call
    }
}

pub fn update_pull_request(owner: &str, repo: &str, number: u64) -> UpdatePullRequest {
    UpdatePullRequest {
        call: repo_call(UPDATE_PULL_REQUEST, owner, repo).arg("pullNumber", number),
    }
}

/// How `merge_pull_request` combines the branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethod {
    Merge,
    Squash,
    Rebase,
}

impl MergeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        }
    }
}

pub fn merge_pull_request(owner: &str, repo: &str, number: u64, method: MergeMethod) -> ToolCall {
    repo_call(MERGE_PULL_REQUEST, owner, repo)
        .arg("pullNumber", number)
        .arg("mergeMethod", method.as_str())
}

pub fn add_pull_request_comment(owner: &str, repo: &str, number: u64, body: &str) -> ToolCall {
    repo_call(ADD_PULL_REQUEST_COMMENT, owner, repo)
        .arg("pullNumber", number)
        .arg("body", body)
}

/// Review verdict for `create_pull_request_review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEvent {
    Approve,
    RequestChanges,
    Comment,
}

impl ReviewEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewEvent::Approve => "APPROVE",
            ReviewEvent::RequestChanges => "REQUEST_CHANGES",
            ReviewEvent::Comment => "COMMENT",
        }
    }
}

pub fn create_pull_request_review(
    owner: &str,
    repo: &str,
    number: u64,
    event: ReviewEvent,
    body: &str,
) -> ToolCall {
    repo_call(CREATE_PULL_REQUEST_REVIEW, owner, repo)
        .arg("pullNumber", number)
        .arg("event", event.as_str())
        .arg("body", body)
}

pub fn get_pull_request_reviews(owner: &str, repo: &str, number: u64) -> ToolCall {
    repo_call(GET_PULL_REQUEST_REVIEWS, owner, repo).arg("pullNumber", number)
}
