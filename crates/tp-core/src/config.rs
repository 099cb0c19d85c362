use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var carrying the provider token for the suite.
pub const TOKEN_ENV: &str = "GITHUB_MCP_SERVER_E2E_TOKEN";
/// Optional enterprise host override.
pub const HOST_ENV: &str = "GITHUB_MCP_SERVER_E2E_HOST";
/// Optional comma-separated toolset allow-list.
pub const TOOLSETS_ENV: &str = "GITHUB_TOOLSETS";
/// `1` puts the server under test in read-only mode.
pub const READ_ONLY_ENV: &str = "GITHUB_READ_ONLY";
/// `1` enables dynamic toolset discovery on the server under test.
pub const DYNAMIC_TOOLSETS_ENV: &str = "GITHUB_DYNAMIC_TOOLSETS";
/// Any non-empty value runs a locally installed server binary instead of
/// the container image.
pub const DEBUG_ENV: &str = "GITHUB_MCP_SERVER_E2E_DEBUG";

/// Toolsets enabled when no allow-list is configured.
pub const DEFAULT_TOOLSETS: &[&str] = &["context", "repos", "issues", "pull_requests", "users"];

const PUBLIC_HOST: &str = "https://github.com";

/// Suite-wide configuration, constructed once at suite entry.
///
/// **Security**: the token is resolved at runtime from the env var named by
/// `token_env` and is never serialized. `Debug` output redacts it.
#[derive(Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(skip)]
    pub token: Option<String>,
    /// Env var holding the bearer token (default: `GITHUB_MCP_SERVER_E2E_TOKEN`).
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Enterprise host, e.g. `https://ghe.example.com`.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_toolsets")]
    pub toolsets: Vec<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub dynamic_toolsets: bool,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
}

impl std::fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_env", &self.token_env)
            .field("host", &self.host)
            .field("toolsets", &self.toolsets)
            .field("read_only", &self.read_only)
            .field("dynamic_toolsets", &self.dynamic_toolsets)
            .field("server", &self.server)
            .field("timing", &self.timing)
            .field("resources", &self.resources)
            .finish()
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_env: default_token_env(),
            host: None,
            toolsets: default_toolsets(),
            read_only: false,
            dynamic_toolsets: false,
            server: ServerConfig::default(),
            timing: TimingConfig::default(),
            resources: ResourceConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        cfg.apply_env(&lookup);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a TOML file, then layer env overrides on top.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_from_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_from_with<F>(path: impl Into<PathBuf>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let mut cfg: HarnessConfig =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.apply_env(&lookup);
        cfg.validate()?;
        tracing::debug!(path = %path.display(), "loaded harness config");
        Ok(cfg)
    }

    /// Load `~/.toolprobe/config.toml` when present, otherwise the env alone.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            Self::from_env()
        }
    }

    /// Serialize config to TOML string. The token is never included.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_env<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.token = lookup(&self.token_env).filter(|t| !t.is_empty());
        if let Some(host) = lookup(HOST_ENV).filter(|h| !h.is_empty()) {
            self.host = Some(host);
        }
        if let Some(raw) = lookup(TOOLSETS_ENV) {
            let parsed = parse_toolsets(&raw);
            if !parsed.is_empty() {
                self.toolsets = parsed;
            }
        }
        if lookup(READ_ONLY_ENV).as_deref() == Some("1") {
            self.read_only = true;
        }
        if lookup(DYNAMIC_TOOLSETS_ENV).as_deref() == Some("1") {
            self.dynamic_toolsets = true;
        }
        if lookup(DEBUG_ENV).is_some_and(|v| !v.is_empty()) {
            self.server.mode = ServerMode::Binary;
        }
    }

    /// Semantic validation for settings that are not expressible via types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_none() {
            return Err(ConfigError::MissingToken(self.token_env.clone()));
        }
        if let Some(host) = &self.host {
            if !(host.starts_with("https://") || host.starts_with("http://")) {
                return Err(ConfigError::Validation(format!(
                    "host must be an http(s) URL, got `{host}`"
                )));
            }
        }
        if self.toolsets.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "toolsets must not contain empty names".into(),
            ));
        }
        if self.timing.call_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timing.call_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.resources.repo_name_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "resources.repo_name_prefix must not be empty".into(),
            ));
        }
        self.server.validate()
    }

    /// The bearer token. Only `None` on a config that skipped validation.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The host override when it points at a non-public instance.
    pub fn enterprise_host(&self) -> Option<&str> {
        self.host
            .as_deref()
            .map(|h| h.trim_end_matches('/'))
            .filter(|h| *h != PUBLIC_HOST)
    }

    /// Environment handed to the server under test.
    pub fn server_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (
                "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
                self.token.clone().unwrap_or_default(),
            ),
            ("GITHUB_TOOLSETS".to_string(), self.toolsets.join(",")),
        ];
        if let Some(host) = &self.host {
            env.push(("GITHUB_HOST".to_string(), host.clone()));
        }
        if self.read_only {
            env.push(("GITHUB_READ_ONLY".to_string(), "1".to_string()));
        }
        if self.dynamic_toolsets {
            env.push(("GITHUB_DYNAMIC_TOOLSETS".to_string(), "1".to_string()));
        }
        env
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".toolprobe")
            .join("config.toml")
    }
}

/// Split a comma-separated toolset list, dropping blanks.
pub fn parse_toolsets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing token: set the `{0}` environment variable")]
    MissingToken(String),
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

/// How the server under test is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerMode {
    /// `docker run -i --rm <image> stdio`.
    #[default]
    Container,
    /// A locally installed binary speaking stdio.
    Binary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub mode: ServerMode,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,
    /// Extra arguments appended after `stdio`.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::default(),
            image: default_image(),
            binary: default_binary(),
            container_runtime: default_container_runtime(),
            extra_args: Vec::new(),
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let empty = match self.mode {
            ServerMode::Container => self.image.is_empty() || self.container_runtime.is_empty(),
            ServerMode::Binary => self.binary.is_empty(),
        };
        if empty {
            return Err(ConfigError::Validation(format!(
                "server launch target is empty for mode {:?}",
                self.mode
            )));
        }
        Ok(())
    }

    /// Path of the binary for [`ServerMode::Binary`].
    pub fn binary_path(&self) -> &Path {
        Path::new(&self.binary)
    }
}

fn default_image() -> String {
    "github/e2e-github-mcp-server".into()
}
fn default_binary() -> String {
    "github-mcp-server".into()
}
fn default_container_runtime() -> String {
    "docker".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Fixed delay applied between paced calls.
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    /// Upper bound for a single transport round trip.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl TimingConfig {
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn default_rate_limit_delay_ms() -> u64 {
    1000
}
fn default_call_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Prefix of every repository the suite creates.
    #[serde(default = "default_repo_name_prefix")]
    pub repo_name_prefix: String,
    /// Branch new branches fork from.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            repo_name_prefix: default_repo_name_prefix(),
            base_branch: default_base_branch(),
        }
    }
}

fn default_repo_name_prefix() -> String {
    "github-mcp-server-e2e".into()
}
fn default_base_branch() -> String {
    "main".into()
}

fn default_token_env() -> String {
    TOKEN_ENV.into()
}

fn default_toolsets() -> Vec<String> {
    DEFAULT_TOOLSETS.iter().map(|s| s.to_string()).collect()
}
