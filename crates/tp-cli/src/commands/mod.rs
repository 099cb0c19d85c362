pub mod call;
pub mod load;
pub mod tools;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tp_core::config::HarnessConfig;
use tp_harness::stdio::StdioSession;
use tp_harness::Session;

/// Explicit file, else `~/.toolprobe/config.toml`, else the environment.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    let config = match path {
        Some(path) => HarnessConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => HarnessConfig::load().context("failed to load configuration")?,
    };
    tracing::debug!(config = ?config, "configuration loaded");
    Ok(config)
}

pub async fn connect(config: &HarnessConfig) -> anyhow::Result<Arc<dyn Session>> {
    let session = StdioSession::connect(config)
        .await
        .context("could not start the tool server (is docker running, or the binary installed?)")?;
    Ok(Arc::new(session))
}

/// Parse `--args` into a JSON object.
pub fn parse_args(raw: &str) -> anyhow::Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("--args is not valid JSON: {raw}"))?;
    if !value.is_object() {
        anyhow::bail!("--args must be a JSON object, got {raw}");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_accepts_objects_only() {
        assert_eq!(parse_args(r#"{"owner":"octo"}"#).unwrap()["owner"], "octo");
        assert!(parse_args("[1,2]").is_err());
        assert!(parse_args("{not json").is_err());
    }
}
