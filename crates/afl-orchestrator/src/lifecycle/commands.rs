//! Remote command builders for screen-managed servers
//!
//! Commands run from the SSH user's home directory, so log paths are
//! relative to it.

use afl_core::{LaunchSpec, ServerDefinition};

use crate::error::OrchestratorError;

/// Directory (relative to the remote home) holding logs and the config document
pub const REMOTE_DIR: &str = ".afl";

/// Interpreter used for module launches
const PYTHON: &str = "python3";

/// Log file of a server's screen session, relative to the remote home
pub fn log_path(server: &ServerDefinition) -> String {
    format!("{}/{}.screenlog", REMOTE_DIR, server.session_name)
}

/// Launch the server in a detached, logged screen session
pub fn start_command(server: &ServerDefinition) -> Result<String, OrchestratorError> {
    let launch = server
        .launch
        .as_ref()
        .ok_or_else(|| OrchestratorError::MissingLaunchSpec(server.name.clone()))?;

    let shell = quote(&server.shell)?;
    let program = match launch {
        LaunchSpec::Module { module, env } => {
            let mut inner = String::new();
            if let Some(env) = env {
                inner.push_str(&format!("source {}/bin/activate && ", quote(env)?));
            }
            inner.push_str(&format!("{} -m {}", PYTHON, quote(module)?));
            format!("{} -c {}", shell, quote(&inner)?)
        }
        LaunchSpec::Script { path } => format!("{} {}", shell, quote(path)?),
    };

    Ok(format!(
        "mkdir -p {dir} && screen -dmS {session} -L -Logfile {log} {program}",
        dir = REMOTE_DIR,
        session = quote(&server.session_name)?,
        log = quote(&log_path(server))?,
        program = program,
    ))
}

/// Ask the server's screen session to quit
pub fn stop_command(server: &ServerDefinition) -> Result<String, OrchestratorError> {
    Ok(format!("screen -S {} -X quit", quote(&server.session_name)?))
}

/// Tail the last `lines` lines of the server's log
pub fn log_command(server: &ServerDefinition, lines: usize) -> Result<String, OrchestratorError> {
    Ok(format!("tail -n {} {}", lines, quote(&log_path(server))?))
}

/// Attach to the server's screen session, sharing it with other displays
pub fn join_command(server: &ServerDefinition) -> Result<String, OrchestratorError> {
    Ok(format!("screen -x {}", quote(&server.session_name)?))
}

fn quote(value: &str) -> Result<String, OrchestratorError> {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .map_err(|_| OrchestratorError::Unquotable(value.to_string()))
}
