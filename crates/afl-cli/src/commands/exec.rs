//! Exec command implementation

use anyhow::Result;

use super::report_action;
use crate::app::App;

/// Run an arbitrary command on a server's host. A timeout of 0 waits forever.
pub async fn exec_command(app: &App, server: &str, command: &str, timeout_ms: u64) -> Result<()> {
    let orchestrator = app.orchestrator()?;
    let result = orchestrator
        .execute_command(server, command, timeout_ms)
        .await;
    report_action(app, &format!("{} on {}", command, server), result)
}
