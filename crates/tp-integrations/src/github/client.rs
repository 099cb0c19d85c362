use octocrab::Octocrab;
use thiserror::Error;
use tp_core::config::HarnessConfig;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("missing GitHub token: set `{0}`")]
    MissingToken(String),

    #[error("unexpected GitHub response: {0}")]
    UnexpectedResponse(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl GitHubError {
    /// True for a 404 from the REST API.
    pub fn is_not_found(&self) -> bool {
        match self {
            GitHubError::Api(octocrab::Error::GitHub { source, .. }) => {
                source.status_code.as_u16() == 404
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// REST client for the verification backdoor, authenticated with the same
/// bearer token the server under test receives.
#[derive(Debug, Clone)]
pub struct GitHubVerifier {
    pub(crate) octocrab: Octocrab,
}

impl GitHubVerifier {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let token = config
            .token()
            .ok_or_else(|| GitHubError::MissingToken(config.token_env.clone()))?;

        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(base) = api_base_uri(config) {
            tracing::debug!(base = %base, "using enterprise API base");
            builder = builder.base_uri(base)?;
        }

        Ok(Self {
            octocrab: builder.build()?,
        })
    }

    pub fn inner(&self) -> &Octocrab {
        &self.octocrab
    }
}

/// `<host>/api/v3` for an enterprise host, `None` for github.com.
pub fn api_base_uri(config: &HarnessConfig) -> Option<String> {
    config.enterprise_host().map(|host| format!("{host}/api/v3"))
}
