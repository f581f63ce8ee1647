//! CLI command implementations

mod document;
mod exec;
mod join;
mod lifecycle;
mod status;

pub use document::{
    doc_read_command, doc_write_command, snapshot_get_command, snapshot_save_command,
};
pub use exec::exec_command;
pub use join::{join_command, key_to_bytes};
pub use lifecycle::{log_command, restart_command, start_command, stop_command};
pub use status::{batch_command, hosts_command, status_command};

use anyhow::{bail, Result};
use std::io::Write;

use afl_core::ActionResult;

use crate::app::App;
use crate::output::{print_json, print_success};

/// Print the outcome of a remote action. Anything but completion is an error.
pub(crate) fn report_action(app: &App, label: &str, result: ActionResult) -> Result<()> {
    if app.json {
        print_json(&result)?;
        return match result {
            ActionResult::Completed { .. } => Ok(()),
            ActionResult::SshDown => bail!("{}: SSH DOWN", label),
            ActionResult::Failed { error } => bail!("{}: {}", label, error),
        };
    }

    match result {
        ActionResult::Completed {
            output,
            exit_code,
            exit_signal,
        } => {
            let mut stdout = std::io::stdout();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;

            match (exit_code, exit_signal) {
                (_, Some(signal)) => print_success(&format!("{} (killed by {})", label, signal)),
                (Some(code), None) if code != 0 => {
                    print_success(&format!("{} (exit code {})", label, code))
                }
                _ => print_success(label),
            }
            Ok(())
        }
        ActionResult::SshDown => bail!("{}: SSH DOWN", label),
        ActionResult::Failed { error } => bail!("{}: {}", label, error),
    }
}
