use crate::mcp::ToolCall;

use super::repo_call;

pub const CREATE_ISSUE: &str = "create_issue";
pub const GET_ISSUE: &str = "get_issue";
pub const UPDATE_ISSUE: &str = "update_issue";
pub const LIST_ISSUES: &str = "list_issues";
pub const ADD_ISSUE_COMMENT: &str = "add_issue_comment";
pub const ADD_ISSUE_LABELS: &str = "add_issue_labels";
pub const ADD_ISSUE_ASSIGNEES: &str = "add_issue_assignees";

/// `create_issue`. Responds with the created issue, `number` included.
pub fn create_issue(owner: &str, repo: &str, title: &str, body: Option<&str>) -> ToolCall {
    repo_call(CREATE_ISSUE, owner, repo)
        .arg("title", title)
        .opt_arg("body", body)
}

pub fn get_issue(owner: &str, repo: &str, number: u64) -> ToolCall {
    repo_call(GET_ISSUE, owner, repo).arg("issueNumber", number)
}

/// `update_issue`; only the fields that were set are sent.
#[derive(Debug, Clone)]
pub struct UpdateIssue {
    call: ToolCall,
}

impl UpdateIssue {
    pub fn title(mut self, title: &str) -> Self {
        self.call = self.call.arg("title", title);
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.call = self.call.arg("body", body);
        self
    }

    /// `open` or `closed`.
    pub fn state(mut self, state: &str) -> Self {
        self.call = self.call.arg("state", state);
        self
    }
}

impl From<UpdateIssue> for ToolCall {
    fn from(b: UpdateIssue) -> Self {
        b.call
    }
}

pub fn update_issue(owner: &str, repo: &str, number: u64) -> UpdateIssue {
    UpdateIssue {
        call: repo_call(UPDATE_ISSUE, owner, repo).arg("issueNumber", number),
    }
}

pub fn list_issues(owner: &str, repo: &str, state: Option<&str>) -> ToolCall {
    repo_call(LIST_ISSUES, owner, repo).opt_arg("state", state)
}

pub fn add_issue_comment(owner: &str, repo: &str, number: u64, body: &str) -> ToolCall {
    repo_call(ADD_ISSUE_COMMENT, owner, repo)
        .arg("issueNumber", number)
        .arg("body", body)
}

pub fn add_issue_labels(owner: &str, repo: &str, number: u64, labels: &[&str]) -> ToolCall {
    repo_call(ADD_ISSUE_LABELS, owner, repo)
        .arg("issueNumber", number)
        .arg("labels", labels.to_vec())
}

pub fn add_issue_assignees(owner: &str, repo: &str, number: u64, assignees: &[&str]) -> ToolCall {
    repo_call(ADD_ISSUE_ASSIGNEES, owner, repo)
        .arg("issueNumber", number)
        .arg("assignees", assignees.to_vec())
}
