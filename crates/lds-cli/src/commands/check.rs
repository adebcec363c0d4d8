//! Check command - connectivity testing

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use lds_core::http::build_client;
use lds_core::selection::service_names;
use lds_core::{AdGuardClient, CatalogueSource, FilteringApi, HttpCatalogue};
use std::time::Instant;

use super::config::load_config;
use crate::args::Args as GlobalArgs;

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Skip the catalogue check
    #[arg(long)]
    pub adguard_only: bool,
}

/// Execute check command
pub fn execute(args: &CheckArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global.config.as_deref(), &global.overrides)?;
    let client = build_client(config.sync.timeout.as_duration()).context("Failed to build HTTP client")?;
    let adguard = AdGuardClient::from_config(client.clone(), &config)?;
    let catalogue = HttpCatalogue::from_config(client, &config)?;

    let runtime = super::runtime()?;
    let mut failures = 0;

    println!("Testing AdGuard Home at: {}", config.adguard.url.cyan());
    let start = Instant::now();
    match runtime.block_on(adguard.filtering_status()) {
        Ok(status) => {
            let enabled = if status.enabled {
                "enabled".green()
            } else {
                "disabled".yellow()
            };
            println!(
                "  {} Connected in {:?}: {} user rules, filtering {}",
                "✓".green(),
                start.elapsed(),
                status.user_rules.len(),
                enabled
            );
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            failures += 1;
        }
    }

    if !args.adguard_only {
        println!();
        println!("Testing catalogue at: {}", config.catalogue.base_url.cyan());
        let start = Instant::now();
        match runtime.block_on(catalogue.fetch_catalogue()) {
            Ok(entries) => {
                println!(
                    "  {} Fetched in {:?}: {} services",
                    "✓".green(),
                    start.elapsed(),
                    entries.len()
                );
                println!("  {}", service_names(&entries).join(", "));
            }
            Err(e) => {
                println!("  {} {}", "✗".red(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} connectivity check(s) failed", failures);
    }
    Ok(())
}
