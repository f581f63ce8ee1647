//! afl-cli: Command-line interface for afl
//!
//! Provides the `afl` binary for starting, stopping and inspecting servers
//! running in remote screen sessions.

pub mod app;
pub mod commands;
pub mod output;
