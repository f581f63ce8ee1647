//! Start, stop, restart and log commands

use anyhow::Result;

use super::report_action;
use crate::app::App;
use crate::output::print_info;

/// Launch a server's screen session
pub async fn start_command(app: &App, server: &str) -> Result<()> {
    let orchestrator = app.orchestrator()?;
    if !app.json {
        print_info(&format!("Starting '{}'...", server));
    }
    let result = orchestrator.start_server(server).await;
    report_action(app, &format!("Started {}", server), result)
}

/// Quit a server's screen session
pub async fn stop_command(app: &App, server: &str) -> Result<()> {
    let orchestrator = app.orchestrator()?;
    if !app.json {
        print_info(&format!("Stopping '{}'...", server));
    }
    let result = orchestrator.stop_server(server).await;
    report_action(app, &format!("Stopped {}", server), result)
}

/// Stop then start a server
pub async fn restart_command(app: &App, server: &str) -> Result<()> {
    let orchestrator = app.orchestrator()?;
    if !app.json {
        print_info(&format!("Restarting '{}'...", server));
    }
    let result = orchestrator.restart_server(server).await;
    report_action(app, &format!("Restarted {}", server), result)
}

/// Print the tail of a server's log
pub async fn log_command(app: &App, server: &str, lines: Option<usize>) -> Result<()> {
    let orchestrator = app.orchestrator()?;
    let result = orchestrator.get_server_log(server, lines).await;
    report_action(app, &format!("Log of {}", server), result)
}
