//! Command line for the server under test.

use std::process::Stdio;

use tokio::process::Command;
use tp_core::config::{HarnessConfig, ServerMode};

use crate::session::SessionError;

/// Build the launch command for the configured server.
///
/// Container mode forwards each variable by name (`-e NAME`) and sets the
/// value on the runtime process, so the token never appears in argv.
pub fn server_command(config: &HarnessConfig) -> Result<Command, SessionError> {
    if config.token().is_none() {
        return Err(SessionError::Spawn(format!(
            "no token configured; set `{}`",
            config.token_env
        )));
    }
    let env = config.server_env();
    let server = &config.server;

    let mut command = match server.mode {
        ServerMode::Container => {
            let mut c = Command::new(&server.container_runtime);
            c.args(["run", "-i", "--rm"]);
            for (name, _) in &env {
                c.args(["-e", name.as_str()]);
            }
            c.arg(&server.image);
            c
        }
        ServerMode::Binary => Command::new(server.binary_path()),
    };

    command
        .arg("stdio")
        .args(&server.extra_args)
        .envs(env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    Ok(command)
}
