mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// toolprobe -- drive a live MCP tool server from the command line.
#[derive(Parser, Debug)]
#[command(name = "toolprobe", version, about)]
struct Cli {
    /// Config file (default: ~/.toolprobe/config.toml, then the environment).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the tools the server exposes.
    Tools {
        /// Fail when any of these comma-separated tools is missing.
        #[arg(long, value_delimiter = ',')]
        require: Vec<String>,
    },

    /// Invoke one tool and print its content.
    Call {
        /// Tool name.
        tool: String,
        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Succeed only when the tool reports an error.
        #[arg(long)]
        expect_error: bool,
    },

    /// Concurrent load against one tool.
    Load {
        #[arg(long)]
        tool: String,
        #[arg(long, default_value = "{}")]
        args: String,
        #[arg(long, default_value_t = 5)]
        workers: usize,
        /// Operations per worker.
        #[arg(long, default_value_t = 10)]
        ops: usize,
        /// Fixed delay between one worker's calls.
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        tp_telemetry::logging::init_logging_json("toolprobe", "info");
    } else {
        tp_telemetry::logging::init_logging("toolprobe", "info");
    }

    let config = commands::load_config(cli.config.as_deref())?;
    let session = commands::connect(&config).await?;

    let result = match cli.command {
        Commands::Tools { require } => commands::tools::run(session.clone(), &require).await,
        Commands::Call {
            tool,
            args,
            expect_error,
        } => commands::call::run(session.clone(), &tool, &args, expect_error).await,
        Commands::Load {
            tool,
            args,
            workers,
            ops,
            delay_ms,
        } => {
            let opts = commands::load::LoadOptions {
                tool,
                args,
                workers,
                ops,
                delay_ms,
            };
            commands::load::run(session.clone(), opts).await
        }
    };

    if let Err(err) = tp_harness::Session::close(session.as_ref()).await {
        tracing::warn!(error = %err, "failed to close session");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "toolprobe",
            "call",
            "get_repository",
            "--args",
            r#"{"owner":"octocat","repo":"hello"}"#,
            "--expect-error",
        ])
        .unwrap();
        match cli.command {
            Commands::Call {
                tool, expect_error, ..
            } => {
                assert_eq!(tool, "get_repository");
                assert!(expect_error);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn load_defaults_match_reliability_profile() {
        let cli = Cli::try_parse_from(["toolprobe", "load", "--tool", "get_me"]).unwrap();
        match cli.command {
            Commands::Load { workers, ops, delay_ms, .. } => {
                assert_eq!((workers, ops, delay_ms), (5, 10, 0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn tools_require_is_comma_separated() {
        let cli = Cli::try_parse_from([
            "toolprobe",
            "--config",
            "/tmp/tp.toml",
            "tools",
            "--require",
            "get_me,list_tags",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/tp.toml")));
        match cli.command {
            Commands::Tools { require } => assert_eq!(require, vec!["get_me", "list_tags"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
