//! Command-line argument parsing

use clap::{Parser, ValueEnum};
use lds_core::config::{Config, Interval};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::commands::Command;

/// lancache-dns-sync - lancache DNS rewrites for AdGuard Home
///
/// Reads the cache-domains catalogue and keeps a managed block of
/// AdGuard Home user rules pointing every cached service at the lancache.
/// Without a subcommand it behaves like `run`.
#[derive(Parser, Debug)]
#[command(name = "lancache-dns-sync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Settings that override the configuration file
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Run a single synchronization pass and exit
    #[arg(long, env = "RUN_ONCE", value_parser = clap::builder::BoolishValueParser::new())]
    pub once: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format for logs
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}

/// Flag and environment overrides applied on top of the config file
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// AdGuard Home API base URL
    #[arg(long, env = "ADGUARD_API", value_name = "URL", global = true)]
    pub adguard_api: Option<String>,

    /// AdGuard Home username
    #[arg(long, env = "ADGUARD_USERNAME", value_name = "USER", global = true)]
    pub adguard_username: Option<String>,

    /// AdGuard Home password
    #[arg(
        long,
        env = "ADGUARD_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true,
        global = true
    )]
    pub adguard_password: Option<String>,

    /// Address the cache domains resolve to
    #[arg(long, env = "LANCACHE_SERVER", value_name = "IP", global = true)]
    pub lancache_server: Option<IpAddr>,

    /// Comma separated service names, or `*` for all
    #[arg(long, env = "SERVICE_NAMES", value_name = "LIST", global = true)]
    pub services: Option<String>,

    /// Time between passes, e.g. `6h` or `1h30m`
    #[arg(long, env = "SYNC_INTERVAL", value_name = "DURATION", global = true)]
    pub interval: Option<Interval>,
}

impl Args {
    /// Whether `--once` (or `RUN_ONCE`) was given at either level
    pub fn run_once(&self) -> bool {
        self.once || matches!(self.command, Some(Command::Run(ref run)) if run.once)
    }
}

impl ConfigOverrides {
    /// Overwrite every setting that was given
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref url) = self.adguard_api {
            config.adguard.url = url.clone();
        }
        if let Some(ref username) = self.adguard_username {
            config.adguard.username = username.clone();
        }
        if let Some(ref password) = self.adguard_password {
            config.adguard.password = password.clone();
        }
        if let Some(server) = self.lancache_server {
            config.lancache.server = Some(server);
        }
        if let Some(ref services) = self.services {
            config.set_services_from_list(services);
        }
        if let Some(interval) = self.interval {
            config.sync.interval = interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let args = Args::parse_from(["lancache-dns-sync"]);
        assert!(args.command.is_none());
        assert!(!args.once);
        assert_eq!(args.log_format, LogFormat::Text);
    }

    #[test]
    fn test_verbose() {
        let args = Args::parse_from(["lancache-dns-sync", "-v"]);
        assert_eq!(args.verbose, 1);

        let args = Args::parse_from(["lancache-dns-sync", "-vvv"]);
        assert_eq!(args.verbose, 3);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from([
            "lancache-dns-sync",
            "run",
            "--once",
            "-c",
            "sync.toml",
            "--log-format",
            "json",
        ]);
        assert!(matches!(args.command, Some(Command::Run(ref run)) if run.once));
        assert_eq!(args.config, Some(PathBuf::from("sync.toml")));
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_once_accepted_at_either_level() {
        let args = Args::parse_from(["lancache-dns-sync", "--once", "run"]);
        assert!(args.run_once());

        let args = Args::parse_from(["lancache-dns-sync", "run", "--once"]);
        assert!(args.run_once());

        let args = Args::parse_from(["lancache-dns-sync", "--once"]);
        assert!(args.run_once());
    }

    #[test]
    fn test_overrides_parse() {
        let args = Args::parse_from([
            "lancache-dns-sync",
            "--lancache-server",
            "10.0.0.5",
            "--services",
            "steam,origin",
            "--interval",
            "1h30m",
        ]);
        assert_eq!(args.overrides.lancache_server, Some("10.0.0.5".parse().unwrap()));
        assert_eq!(
            args.overrides.interval.map(Interval::as_duration),
            Some(Duration::from_secs(90 * 60))
        );
    }

    #[test]
    fn test_bad_override_rejected() {
        let result = Args::try_parse_from(["lancache-dns-sync", "--lancache-server", "lancache.lan"]);
        assert!(result.is_err());

        let result = Args::try_parse_from(["lancache-dns-sync", "--interval", "daily"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        config.adguard.username = "from-file".to_string();
        config.sync.services = vec!["steam".to_string()];

        let overrides = ConfigOverrides {
            adguard_api: Some("http://adguard.lan".to_string()),
            services: Some(" origin , wsus ".to_string()),
            ..Default::default()
        };
        overrides.apply(&mut config);

        assert_eq!(config.adguard.url, "http://adguard.lan");
        assert_eq!(config.adguard.username, "from-file");
        assert_eq!(config.sync.services, vec!["origin", "wsus"]);
    }
}
