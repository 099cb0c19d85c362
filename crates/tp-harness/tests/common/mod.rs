//! In-memory GitHub stand-in served through a `ScriptedSession`.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tp_core::config::HarnessConfig;
use tp_harness::lifecycle::RepositoryReaper;
use tp_harness::pacing::Pacer;
use tp_harness::scripted::ScriptedSession;
use tp_harness::tools::{context, issues, pull_requests, repos};
use tp_harness::{HarnessError, TestContext, ToolCall, ToolCallResult};

pub const OWNER: &str = "octocat";

#[derive(Debug, Default)]
struct Repo {
    branches: BTreeMap<String, BTreeMap<String, String>>,
    issues: Vec<String>,
    pulls: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct State {
    repos: HashMap<String, Repo>,
    deleted: Vec<String>,
    fail_deletes: bool,
}

/// Shared provider state. The session and the reaper both act on it, so
/// tests can check what the provider holds after teardown.
#[derive(Debug, Clone, Default)]
pub struct FakeGitHub {
    state: Arc<Mutex<State>>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository_exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().repos.contains_key(name)
    }

    pub fn repository_count(&self) -> usize {
        self.state.lock().unwrap().repos.len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_deletes = true;
    }

    pub fn reaper(&self) -> Arc<dyn RepositoryReaper> {
        Arc::new(FakeReaper {
            github: self.clone(),
        })
    }

    /// A session exposing the baseline repos/issues/pull request tools.
    pub fn session(&self) -> ScriptedSession {
        let s = ScriptedSession::new();
        s.add_tool(context::GET_ME, |_| Ok(ToolCallResult::json(&json!({"login": OWNER, "id": 1}))));

        let gh = self.clone();
        s.add_tool(repos::CREATE_REPOSITORY, move |c| Ok(gh.create_repository(c)));
        let gh = self.clone();
        s.add_tool(repos::GET_REPOSITORY, move |c| Ok(gh.get_repository(c)));
        let gh = self.clone();
        s.add_tool(repos::CREATE_BRANCH, move |c| Ok(gh.create_branch(c)));
        let gh = self.clone();
        s.add_tool(repos::LIST_BRANCHES, move |c| Ok(gh.list_branches(c)));
        let gh = self.clone();
        s.add_tool(repos::CREATE_OR_UPDATE_FILE, move |c| Ok(gh.put_file(c)));
        let gh = self.clone();
        s.add_tool(repos::GET_FILE_CONTENTS, move |c| Ok(gh.get_file(c)));
        let gh = self.clone();
        s.add_tool(issues::CREATE_ISSUE, move |c| Ok(gh.create_issue(c)));
        let gh = self.clone();
        s.add_tool(issues::GET_ISSUE, move |c| Ok(gh.get_issue(c)));
        let gh = self.clone();
        s.add_tool(pull_requests::CREATE_PULL_REQUEST, move |c| Ok(gh.create_pull(c)));
        let gh = self.clone();
        s.add_tool(pull_requests::GET_PULL_REQUEST, move |c| Ok(gh.get_pull(c)));
        s
    }

    fn create_repository(&self, c: &ToolCall) -> ToolCallResult {
        let name = arg(c, "name");
        let mut state = self.state.lock().unwrap();
        if state.repos.contains_key(&name) {
            return ToolCallResult::error("failed to create repository: name already exists on this account");
        }
        let mut repo = Repo::default();
        if c.argument("autoInit") == Some(&json!(true)) {
            let mut files = BTreeMap::new();
            files.insert("README.md".to_string(), format!("# {name}\n"));
            repo.branches.insert("main".to_string(), files);
        }
        state.repos.insert(name.clone(), repo);
        ToolCallResult::json(&json!({
            "name": name,
            "full_name": format!("{OWNER}/{name}"),
            "private": c.argument("private"),
        }))
    }

    fn with_repo(&self, c: &ToolCall, f: impl FnOnce(&str, &mut Repo) -> ToolCallResult) -> ToolCallResult {
        if arg(c, "owner") != OWNER {
            return ToolCallResult::error("failed to get repository: 404 Not Found");
        }
        let name = arg(c, "repo");
        let mut state = self.state.lock().unwrap();
        match state.repos.get_mut(&name) {
            Some(repo) => f(&name, repo),
            None => ToolCallResult::error("failed to get repository: 404 Not Found"),
        }
    }

    fn get_repository(&self, c: &ToolCall) -> ToolCallResult {
        self.with_repo(c, |name, _| {
            ToolCallResult::json(&json!({"name": name, "full_name": format!("{OWNER}/{name}")}))
        })
    }

    fn create_branch(&self, c: &ToolCall) -> ToolCallResult {
        let branch = arg(c, "branch");
        let from = arg(c, "from_branch");
        self.with_repo(c, |_, repo| {
            if repo.branches.contains_key(&branch) {
                return ToolCallResult::error("failed to create branch: Reference already exists");
            }
            let Some(files) = repo.branches.get(&from).cloned() else {
                return ToolCallResult::error("failed to get reference: 404 Not Found");
            };
            repo.branches.insert(branch.clone(), files);
            ToolCallResult::json(&json!({"ref": format!("refs/heads/{branch}")}))
        })
    }

    fn list_branches(&self, c: &ToolCall) -> ToolCallResult {
        self.with_repo(c, |_, repo| {
            let names: Vec<Value> = repo.branches.keys().map(|b| json!({"name": b})).collect();
            ToolCallResult::json(&Value::Array(names))
        })
    }

    fn put_file(&self, c: &ToolCall) -> ToolCallResult {
        let (branch, path, content) = (arg(c, "branch"), arg(c, "path"), arg(c, "content"));
        self.with_repo(c, |_, repo| match repo.branches.get_mut(&branch) {
            Some(files) => {
                files.insert(path.clone(), content);
                ToolCallResult::json(&json!({"content": {"path": path}, "commit": {"sha": "abc"}}))
            }
            None => ToolCallResult::error("failed to create file: branch not found"),
        })
    }

    fn get_file(&self, c: &ToolCall) -> ToolCallResult {
        let (branch, path) = (arg(c, "branch"), arg(c, "path"));
        self.with_repo(c, |name, repo| {
            match repo.branches.get(&branch).and_then(|files| files.get(&path)) {
                Some(text) => ToolCallResult::with_text_resource(
                    "successfully downloaded text file",
                    format!("repo://{OWNER}/{name}/refs/heads/{branch}/contents/{path}"),
                    text.clone(),
                ),
                None => ToolCallResult::error("failed to get file contents: 404 Not Found"),
            }
        })
    }

    fn create_issue(&self, c: &ToolCall) -> ToolCallResult {
        let title = arg(c, "title");
        self.with_repo(c, |_, repo| {
            repo.issues.push(title.clone());
            ToolCallResult::json(&json!({"number": repo.issues.len(), "title": title, "state": "open"}))
        })
    }

    fn get_issue(&self, c: &ToolCall) -> ToolCallResult {
        let number = c.argument("issueNumber").and_then(Value::as_u64).unwrap_or(0) as usize;
        self.with_repo(c, |_, repo| match number.checked_sub(1).and_then(|i| repo.issues.get(i)) {
            Some(title) => ToolCallResult::json(&json!({"number": number, "title": title})),
            None => ToolCallResult::error("failed to get issue: 404 Not Found"),
        })
    }

    fn create_pull(&self, c: &ToolCall) -> ToolCallResult {
        let (title, head) = (arg(c, "title"), arg(c, "head"));
        self.with_repo(c, |_, repo| {
            if !repo.branches.contains_key(&head) {
                return ToolCallResult::error("failed to create pull request: head branch not found");
            }
            repo.pulls.push((title.clone(), head.clone()));
            ToolCallResult::json(&json!({"number": repo.pulls.len(), "title": title, "head": {"ref": head}}))
        })
    }

    fn get_pull(&self, c: &ToolCall) -> ToolCallResult {
        let number = c.argument("pullNumber").and_then(Value::as_u64).unwrap_or(0) as usize;
        self.with_repo(c, |_, repo| match number.checked_sub(1).and_then(|i| repo.pulls.get(i)) {
            Some((title, head)) => {
                ToolCallResult::json(&json!({"number": number, "title": title, "head": {"ref": head}}))
            }
            None => ToolCallResult::error("failed to get pull request: 404 Not Found"),
        })
    }
}

fn arg(c: &ToolCall, key: &str) -> String {
    c.argument(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

struct FakeReaper {
    github: FakeGitHub,
}

#[async_trait]
impl RepositoryReaper for FakeReaper {
    async fn delete_repository(&self, owner: &str, name: &str) -> Result<(), HarnessError> {
        let mut state = self.github.state.lock().unwrap();
        if state.fail_deletes {
            return Err(HarnessError::Teardown {
                resource: format!("{owner}/{name}"),
                message: "403 Must have admin rights to Repository".to_string(),
            });
        }
        state.repos.remove(name);
        state.deleted.push(name.to_string());
        Ok(())
    }
}

pub fn test_config() -> Arc<HarnessConfig> {
    Arc::new(HarnessConfig {
        token: Some("test-token".to_string()),
        ..HarnessConfig::default()
    })
}

/// A context over `session`, with pacing disabled.
pub async fn context_for(
    name: &str,
    github: &FakeGitHub,
    session: ScriptedSession,
) -> (Arc<TestContext>, Arc<ScriptedSession>) {
    let session = Arc::new(session);
    let ctx = TestContext::builder(name, test_config(), session.clone(), github.reaper())
        .pacer(Pacer::disabled())
        .build()
        .await
        .unwrap();
    (ctx, session)
}
