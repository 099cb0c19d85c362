use crate::mcp::ToolCall;

use super::repo_call;

pub const CREATE_REPOSITORY: &str = "create_repository";
pub const GET_REPOSITORY: &str = "get_repository";
pub const LIST_REPOSITORIES: &str = "list_repositories";
pub const SEARCH_REPOSITORIES: &str = "search_repositories";
pub const LIST_BRANCHES: &str = "list_branches";
pub const CREATE_BRANCH: &str = "create_branch";
pub const CREATE_OR_UPDATE_FILE: &str = "create_or_update_file";
pub const GET_FILE_CONTENTS: &str = "get_file_contents";
pub const DELETE_FILE: &str = "delete_file";
pub const LIST_COMMITS: &str = "list_commits";
pub const GET_COMMIT: &str = "get_commit";
pub const LIST_TAGS: &str = "list_tags";
pub const GET_TAG: &str = "get_tag";

/// `create_repository`. Test defaults: private and auto-initialized.
#[derive(Debug, Clone)]
pub struct CreateRepository {
    name: String,
    description: Option<String>,
    private: bool,
    auto_init: bool,
}

impl CreateRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            private: true,
            auto_init: true,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn auto_init(mut self, auto_init: bool) -> Self {
        self.auto_init = auto_init;
        self
    }
}

impl From<CreateRepository> for ToolCall {
    fn from(b: CreateRepository) -> Self {
        ToolCall::new(CREATE_REPOSITORY)
            .arg("name", b.name)
            .opt_arg("description", b.description)
            .arg("private", b.private)
            .arg("autoInit", b.auto_init)
    }
}

pub fn create_repository(name: impl Into<String>) -> CreateRepository {
    CreateRepository::new(name)
}

pub fn get_repository(owner: &str, repo: &str) -> ToolCall {
    repo_call(GET_REPOSITORY, owner, repo)
}

pub fn list_repositories(user: &str) -> ToolCall {
    ToolCall::new(LIST_REPOSITORIES).arg("user", user)
}

pub fn search_repositories(query: &str) -> ToolCall {
    ToolCall::new(SEARCH_REPOSITORIES).arg("query", query)
}

pub fn list_branches(owner: &str, repo: &str) -> ToolCall {
    repo_call(LIST_BRANCHES, owner, repo)
}

pub fn create_branch(owner: &str, repo: &str, branch: &str, from_branch: &str) -> ToolCall {
    repo_call(CREATE_BRANCH, owner, repo)
        .arg("branch", branch)
        .arg("from_branch", from_branch)
}

/// `create_or_update_file`. Updating an existing file needs its blob `sha`.
#[derive(Debug, Clone)]
pub struct CreateOrUpdateFile {
    call: ToolCall,
}

impl CreateOrUpdateFile {
    pub fn sha(mut self, sha: impl Into<String>) -> Self {
        self.call = self.call.arg("sha", sha.into());
        self
    }
}

impl From<CreateOrUpdateFile> for ToolCall {
    fn from(b: CreateOrUpdateFile) -> Self {
        b.call
    }
}

pub fn create_or_update_file(
    owner: &str,
    repo: &str,
    branch: &str,
    path: &str,
    content: &str,
    message: &str,
) -> CreateOrUpdateFile {
    CreateOrUpdateFile {
        call: repo_call(CREATE_OR_UPDATE_FILE, owner, repo)
            .arg("path", path)
            .arg("content", content)
            .arg("message", message)
            .arg("branch", branch),
    }
}

/// `get_file_contents`. Responds with an acknowledgment plus an embedded
/// text resource holding the file body.
pub fn get_file_contents(owner: &str, repo: &str, branch: &str, path: &str) -> ToolCall {
    repo_call(GET_FILE_CONTENTS, owner, repo)
        .arg("path", path)
        .arg("branch", branch)
}

pub fn delete_file(owner: &str, repo: &str, branch: &str, path: &str, message: &str) -> ToolCall {
    repo_call(DELETE_FILE, owner, repo)
        .arg("path", path)
        .arg("message", message)
        .arg("branch", branch)
}

/// Commits reachable from `sha` (a branch name or commit), default branch
/// when `None`.
pub fn list_commits(owner: &str, repo: &str, sha: Option<&str>) -> ToolCall {
    repo_call(LIST_COMMITS, owner, repo).opt_arg("sha", sha)
}

pub fn get_commit(owner: &str, repo: &str, sha: &str) -> ToolCall {
    repo_call(GET_COMMIT, owner, repo).arg("sha", sha)
}

pub fn list_tags(owner: &str, repo: &str) -> ToolCall {
    repo_call(LIST_TAGS, owner, repo)
}

pub fn get_tag(owner: &str, repo: &str, tag: &str) -> ToolCall {
    repo_call(GET_TAG, owner, repo).arg("tag", tag)
}
