//! Output formatting utilities for the CLI
//!
//! Tables for server states, hosts and session listings, plus coloured
//! status lines on the terminal.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use afl_core::{ServerRegistry, ServerState};

/// Format polled server states as an ASCII table
///
/// Servers missing from the registry (it may have been replaced while the
/// poll ran) are shown with `-` for host and session.
pub fn format_server_states(
    states: &BTreeMap<String, ServerState>,
    registry: &ServerRegistry,
) -> String {
    if states.is_empty() {
        return "No active servers configured".to_string();
    }

    #[derive(Tabled)]
    struct StateRow {
        #[tabled(rename = "SERVER")]
        name: String,
        #[tabled(rename = "HOST")]
        host: String,
        #[tabled(rename = "SESSION")]
        session: String,
        #[tabled(rename = "STATE")]
        state: String,
    }

    let rows: Vec<StateRow> = states
        .iter()
        .map(|(name, state)| {
            let server = registry.get(name);
            StateRow {
                name: name.clone(),
                host: server.map(|s| s.host.clone()).unwrap_or_else(|| "-".to_string()),
                session: server
                    .map(|s| s.session_name.clone())
                    .unwrap_or_else(|| "-".to_string()),
                state: state.to_string(),
            }
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format active servers grouped by host
pub fn format_hosts(by_host: &BTreeMap<String, Vec<String>>) -> String {
    if by_host.is_empty() {
        return "No active servers configured".to_string();
    }

    #[derive(Tabled)]
    struct HostRow {
        #[tabled(rename = "HOST")]
        host: String,
        #[tabled(rename = "SERVERS")]
        servers: String,
    }

    let rows: Vec<HostRow> = by_host
        .iter()
        .map(|(host, names)| HostRow {
            host: host.clone(),
            servers: names.join(", "),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format the screen sessions live on a host
pub fn format_sessions(host: &str, sessions: &BTreeSet<String>) -> String {
    if sessions.is_empty() {
        return format!("No screen sessions on {}", host);
    }

    #[derive(Tabled)]
    struct SessionRow {
        #[tabled(rename = "SESSION")]
        name: String,
    }

    let rows: Vec<SessionRow> = sessions
        .iter()
        .map(|name| SessionRow { name: name.clone() })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print any result as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
