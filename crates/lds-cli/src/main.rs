//! lancache-dns-sync CLI
//!
//! Keeps AdGuard Home DNS rewrites pointed at a lancache.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;
use commands::Command;

fn main() -> Result<()> {
    let args = Args::parse();

    // Held until exit so buffered file logs get flushed
    let _log_guard = logging::init(&args)?;

    let result = run(&args);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Some(Command::Config(config_args)) => commands::config::execute(config_args, args),
        Some(Command::Check(check_args)) => commands::check::execute(check_args, args),
        Some(Command::Completions(comp_args)) => commands::completions::execute(comp_args),
        Some(Command::Run(_)) | None => {
            let run_args = commands::run::RunArgs {
                once: args.run_once(),
            };
            commands::run::execute(&run_args, args)
        }
    }
}
