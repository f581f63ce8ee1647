//! Status, hosts and batch commands

use anyhow::{bail, Result};

use afl_core::{BatchStatusResult, ServerState, StatusResult};

use crate::app::App;
use crate::output::{
    format_hosts, format_server_states, format_sessions, print_json, print_warning,
};

/// Show one server's state, or poll every active server when `server` is `None`
pub async fn status_command(app: &App, server: Option<&str>) -> Result<()> {
    let orchestrator = app.orchestrator()?;

    let Some(name) = server else {
        let states = orchestrator.poll_all().await;
        if app.json {
            return print_json(&states);
        }
        println!("{}", format_server_states(&states, &app.registry));
        return Ok(());
    };

    let result = orchestrator.get_server_status(name).await;
    if app.json {
        print_json(&result)?;
    }

    match &result {
        StatusResult::Failed { error } => bail!("{}: {}", name, error),
        _ if app.json => Ok(()),
        _ => {
            let state = ServerState::from(&result);
            if state == ServerState::SshDown {
                print_warning(&format!("{}: {}", name, state));
            } else {
                println!("{}: {}", name, state);
            }
            Ok(())
        }
    }
}

/// Show active servers grouped by host. Makes no remote calls.
pub fn hosts_command(app: &App) -> Result<()> {
    let by_host = app.registry.servers_by_host();
    if app.json {
        return print_json(&by_host);
    }
    if by_host.is_empty() {
        print_warning(&format!("No active servers in {}", app.config_path.display()));
        return Ok(());
    }
    println!("{}", format_hosts(&by_host));
    Ok(())
}

/// List every live screen session on a host
pub async fn batch_command(app: &App, host: &str) -> Result<()> {
    let orchestrator = app.orchestrator()?;
    let result = orchestrator.get_batch_server_status(host).await;
    if app.json {
        print_json(&result)?;
    }

    match result {
        BatchStatusResult::Sessions { sessions } => {
            if !app.json {
                println!("{}", format_sessions(host, &sessions));
            }
            Ok(())
        }
        BatchStatusResult::SshDown => bail!("{}: SSH DOWN", host),
        BatchStatusResult::Failed { error } => bail!("{}: {}", host, error),
    }
}
