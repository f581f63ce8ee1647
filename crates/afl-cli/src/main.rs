//! afl CLI
//!
//! Manages long-running servers that live in named screen sessions on
//! remote hosts, reached over SSH.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use afl_cli::app::App;
use afl_cli::commands;
use afl_cli::output::print_error;

#[derive(Parser)]
#[command(name = "afl")]
#[command(author, version, about = "Remote screen session orchestrator")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "AFL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command on a server's host
    Exec {
        /// Server name
        server: String,
        /// Command line passed to the remote shell
        command: String,
        /// Time budget in milliseconds (0 waits forever)
        #[arg(long, default_value_t = 0)]
        timeout_ms: u64,
    },

    /// Launch a server in a detached screen session
    Start {
        /// Server name
        server: String,
    },

    /// Quit a server's screen session
    Stop {
        /// Server name
        server: String,
    },

    /// Stop then start a server
    Restart {
        /// Server name
        server: String,
    },

    /// Show a server's state, or poll every active server
    Status {
        /// Server name (omit to poll all hosts)
        server: Option<String>,
    },

    /// List active servers grouped by host
    Hosts,

    /// List every screen session on a host
    Batch {
        /// Host name
        host: String,
    },

    /// Print the tail of a server's log
    Log {
        /// Server name
        server: String,
        /// Number of lines (defaults to the configured log_lines)
        #[arg(short = 'n', long)]
        lines: Option<usize>,
    },

    /// Attach to a server's screen session (Ctrl+] detaches)
    Join {
        /// Server name
        server: String,
    },

    /// Read or save configuration snapshots on a host
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Read or write remote text files
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// Show the newest snapshot
    Get {
        /// Host name
        host: String,
    },
    /// Save a snapshot given as JSON
    Save {
        /// Host name
        host: String,
        /// Snapshot as JSON text
        snapshot: String,
    },
}

#[derive(Subcommand)]
enum DocAction {
    /// Print a remote file
    Read {
        /// Host name
        host: String,
        /// Remote path
        path: String,
    },
    /// Replace a remote file
    Write {
        /// Host name
        host: String,
        /// Remote path
        path: String,
        /// New file contents
        content: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::load(cli.config.as_deref(), cli.json)?;

    match cli.command {
        Commands::Exec {
            server,
            command,
            timeout_ms,
        } => commands::exec_command(&app, &server, &command, timeout_ms).await,
        Commands::Start { server } => commands::start_command(&app, &server).await,
        Commands::Stop { server } => commands::stop_command(&app, &server).await,
        Commands::Restart { server } => commands::restart_command(&app, &server).await,
        Commands::Status { server } => commands::status_command(&app, server.as_deref()).await,
        Commands::Hosts => commands::hosts_command(&app),
        Commands::Batch { host } => commands::batch_command(&app, &host).await,
        Commands::Log { server, lines } => commands::log_command(&app, &server, lines).await,
        Commands::Join { server } => commands::join_command(&app, &server).await,
        Commands::Snapshot { action } => match action {
            SnapshotAction::Get { host } => commands::snapshot_get_command(&app, &host).await,
            SnapshotAction::Save { host, snapshot } => {
                commands::snapshot_save_command(&app, &host, &snapshot).await
            }
        },
        Commands::Doc { action } => match action {
            DocAction::Read { host, path } => commands::doc_read_command(&app, &host, &path).await,
            DocAction::Write {
                host,
                path,
                content,
            } => commands::doc_write_command(&app, &host, &path, &content).await,
        },
    }
}
