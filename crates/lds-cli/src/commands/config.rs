//! Config command - configuration management

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use lds_core::config::Config;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::args::{Args as GlobalArgs, ConfigOverrides};

/// Config file looked for in the working directory
pub const LOCAL_CONFIG_FILE: &str = "lancache-dns-sync.toml";

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (password redacted)
    Show,

    /// Validate the effective configuration
    Validate,

    /// Show config file locations
    Paths,
}

/// Execute config command
pub fn execute(args: &ConfigArgs, global: &GlobalArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(global),
        ConfigAction::Validate => validate_config(global),
        ConfigAction::Paths => show_paths(),
    }
}

/// Load the config file (explicit or discovered) and apply overrides
///
/// Without any file the defaults are used, so a pure environment setup works.
pub fn load_config(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config> {
    let path = explicit.map(Path::to_path_buf).or_else(find_config_file);

    let mut config = match path {
        Some(ref path) => {
            debug!(path = %path.display(), "Loading configuration file");
            Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            debug!("No configuration file found, using defaults and environment");
            Config::default()
        }
    };

    overrides.apply(&mut config);
    Ok(config)
}

fn show_config(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global.config.as_deref(), &global.overrides)?;

    let toml_str = config
        .redacted()
        .to_toml()
        .context("Failed to serialize config")?;

    println!("{}", toml_str);
    Ok(())
}

fn validate_config(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global.config.as_deref(), &global.overrides)?;

    config.validate().context("Configuration validation failed")?;

    let services = if config.sync.services.is_empty() {
        "-".to_string()
    } else {
        config.sync.services.join(", ")
    };

    println!("{} Configuration is valid", "✓".green());
    println!("  AdGuard Home: {}", config.adguard.url);
    if let Some(server) = config.lancache.server {
        println!("  Lancache: {}", server);
    }
    println!("  Services: {}", services);
    println!("  Interval: {}", config.sync.interval);

    Ok(())
}

fn show_paths() -> Result<()> {
    println!("Configuration file search paths:");
    println!();
    println!("  1. ./{}", LOCAL_CONFIG_FILE);
    if let Some(path) = user_config_file() {
        println!("  2. {}", path.display());
    }
    println!();
    println!("Environment overrides:");
    println!();
    for var in [
        "ADGUARD_API",
        "ADGUARD_USERNAME",
        "ADGUARD_PASSWORD",
        "LANCACHE_SERVER",
        "SERVICE_NAMES",
        "SYNC_INTERVAL",
        "RUN_ONCE",
    ] {
        println!("  {}", var);
    }

    Ok(())
}

fn user_config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "lancache-dns-sync")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    user_config_file().filter(|path| path.exists())
}
