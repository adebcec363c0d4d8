//! CLI commands

pub mod check;
pub mod completions;
pub mod config;
pub mod run;

use anyhow::{Context, Result};
use clap::Subcommand;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synchronize now and keep syncing on the configured interval (default)
    Run(run::RunArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Test connectivity to AdGuard Home and the catalogue
    Check(check::CheckArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Multi-threaded runtime for commands that talk to the network
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}
