//! Snapshot and remote document commands

use anyhow::{bail, Context, Result};
use std::io::Write;

use afl_core::{DocumentReadResult, SnapshotResult, WriteResult};

use crate::app::App;
use crate::output::{print_info, print_json, print_success};

/// Show the newest configuration snapshot on a host
pub async fn snapshot_get_command(app: &App, host: &str) -> Result<()> {
    let orchestrator = app.orchestrator()?;
    let result = orchestrator.get_remote_snapshot(host).await;
    if app.json {
        print_json(&result)?;
    }

    match result {
        SnapshotResult::Latest {
            timestamp,
            snapshot,
        } => {
            if !app.json {
                print_info(&format!("Snapshot {} on {}", timestamp, host));
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Ok(())
        }
        SnapshotResult::Empty => {
            if !app.json {
                print_info(&format!("No snapshots on {}", host));
            }
            Ok(())
        }
        SnapshotResult::Failed { error } => bail!("{}: {}", host, error),
    }
}

/// Save a configuration snapshot given as JSON text
pub async fn snapshot_save_command(app: &App, host: &str, snapshot: &str) -> Result<()> {
    let snapshot: serde_json::Value =
        serde_json::from_str(snapshot).context("Snapshot is not valid JSON")?;

    let orchestrator = app.orchestrator()?;
    let result = orchestrator.save_snapshot(host, snapshot).await;
    report_write(app, &format!("Snapshot saved on {}", host), result)
}

/// Print a remote text file
pub async fn doc_read_command(app: &App, host: &str, path: &str) -> Result<()> {
    let orchestrator = app.orchestrator()?;
    let result = orchestrator.read_remote_document(host, path).await;
    if app.json {
        print_json(&result)?;
    }

    match result {
        DocumentReadResult::Loaded { data } => {
            if !app.json {
                let mut stdout = std::io::stdout();
                stdout.write_all(data.as_bytes())?;
                stdout.flush()?;
            }
            Ok(())
        }
        DocumentReadResult::Failed { error } => bail!("{}:{}: {}", host, path, error),
    }
}

/// Replace a remote text file
pub async fn doc_write_command(app: &App, host: &str, path: &str, content: &str) -> Result<()> {
    let orchestrator = app.orchestrator()?;
    let result = orchestrator.write_remote_document(host, path, content).await;
    report_write(app, &format!("Wrote {}:{}", host, path), result)
}

fn report_write(app: &App, label: &str, result: WriteResult) -> Result<()> {
    if app.json {
        print_json(&result)?;
    }

    match result {
        WriteResult::Written => {
            if !app.json {
                print_success(label);
            }
            Ok(())
        }
        WriteResult::Failed { error } => bail!("{}", error),
    }
}
