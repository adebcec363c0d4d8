//! Configuration management for lancache-dns-sync
//!
//! Provides a strongly-typed configuration system with TOML support. The
//! CLI layers environment variables and flags on top of the file.

mod interval;

pub use interval::Interval;

use crate::error::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Default cache-domains catalogue location
pub const DEFAULT_CATALOGUE_URL: &str =
    "https://raw.githubusercontent.com/uklans/cache-domains/master/";

/// Default index document inside the catalogue
pub const DEFAULT_CATALOGUE_INDEX: &str = "cache_domains.json";

/// Default time between synchronization passes
pub const DEFAULT_SYNC_INTERVAL: Interval = Interval::from_secs(24 * 60 * 60);

/// Shortest accepted sync interval
pub const MIN_SYNC_INTERVAL: Interval = Interval::from_secs(60);

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Interval = Interval::from_secs(30);

/// Default number of domain files fetched in parallel
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Service name meaning "every service in the catalogue"
pub const ALL_SERVICES: &str = "*";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AdGuard Home connection settings
    pub adguard: AdGuardConfig,

    /// Lancache target settings
    pub lancache: LancacheConfig,

    /// Synchronization behaviour
    pub sync: SyncSettings,

    /// Catalogue source
    pub catalogue: CatalogueConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config_value("config", e.to_string()))
    }

    /// Copy of this configuration that is safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.adguard.password.is_empty() {
            config.adguard.password = "********".to_string();
        }
        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.adguard_url()?;

        if self.adguard.username.is_empty() {
            return Err(Error::config_value("adguard.username", "Required (ADGUARD_USERNAME)"));
        }
        if self.adguard.password.is_empty() {
            return Err(Error::config_value("adguard.password", "Required (ADGUARD_PASSWORD)"));
        }

        if self.lancache.server.is_none() {
            return Err(Error::config_value("lancache.server", "Required (LANCACHE_SERVER)"));
        }

        if self.service_selection().is_empty() {
            return Err(Error::config_value(
                "sync.services",
                "At least one service must be specified (use '*' for all services)",
            ));
        }

        if self.sync.interval < MIN_SYNC_INTERVAL {
            return Err(Error::config_value(
                "sync.interval",
                format!(
                    "Interval too short: {} (minimum: {})",
                    self.sync.interval, MIN_SYNC_INTERVAL
                ),
            ));
        }

        if self.sync.timeout.as_duration().is_zero() {
            return Err(Error::config_value("sync.timeout", "Must be greater than zero"));
        }

        if self.sync.concurrency == 0 {
            return Err(Error::config_value("sync.concurrency", "Must be at least 1"));
        }

        self.catalogue_base_url()?;

        Ok(())
    }

    /// Parsed AdGuard API base URL
    pub fn adguard_url(&self) -> Result<Url> {
        parse_http_url("adguard.url", &self.adguard.url)
    }

    /// Parsed catalogue base URL, always ending in `/` so relative paths join under it
    pub fn catalogue_base_url(&self) -> Result<Url> {
        let mut raw = self.catalogue.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        parse_http_url("catalogue.base_url", &raw)
    }

    /// Services selected for synchronization
    pub fn service_selection(&self) -> ServiceSelection {
        ServiceSelection::from_names(&self.sync.services)
    }

    /// Replace the service list from a comma separated string (`SERVICE_NAMES`)
    pub fn set_services_from_list(&mut self, list: &str) {
        self.sync.services = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Runtime view consumed by the synchronization core
    pub fn sync_config(&self) -> Result<SyncConfig> {
        let target = self
            .lancache
            .server
            .ok_or_else(|| Error::config_value("lancache.server", "Required (LANCACHE_SERVER)"))?;

        Ok(SyncConfig {
            services: self.service_selection(),
            target,
            concurrency: self.sync.concurrency,
            timeout: self.sync.timeout.as_duration(),
        })
    }
}

fn parse_http_url(key: &str, raw: &str) -> Result<Url> {
    if raw.trim().is_empty() {
        return Err(Error::config_value(key, "Required"));
    }
    let url = Url::parse(raw).map_err(|e| Error::config_value(key, format!("Invalid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::config_value(
            key,
            format!("Must use http or https scheme, got '{other}'"),
        )),
    }
}

/// AdGuard Home connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdGuardConfig {
    /// API base URL, e.g. `http://adguard.lan:3000`
    pub url: String,
    /// Basic-auth user
    pub username: String,
    /// Basic-auth password
    pub password: String,
}

/// Lancache target settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LancacheConfig {
    /// Address every cache domain is rewritten to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<IpAddr>,
}

/// Synchronization behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Service names to sync, or `["*"]` for all
    pub services: Vec<String>,
    /// Time between passes in daemon mode
    pub interval: Interval,
    /// Per-request timeout
    pub timeout: Interval,
    /// Maximum domain files downloaded at once
    pub concurrency: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            interval: DEFAULT_SYNC_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Catalogue source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueConfig {
    /// Base URL; the index and every domain file resolve against it
    pub base_url: String,
    /// Index document path relative to `base_url`
    pub index: String,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOGUE_URL.to_string(),
            index: DEFAULT_CATALOGUE_INDEX.to_string(),
        }
    }
}

/// Which catalogue services to synchronize
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceSelection {
    /// Every service in the catalogue
    All,
    /// Only the named services
    Named(BTreeSet<String>),
}

impl ServiceSelection {
    /// Build a selection from configured names
    ///
    /// Names are trimmed and blanks dropped. A lone `*` selects everything;
    /// mixed with other names it is just another name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        if names.len() == 1 && names.contains(ALL_SERVICES) {
            Self::All
        } else {
            Self::Named(names)
        }
    }

    /// Whether `service` is selected
    pub fn contains(&self, service: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(names) => names.contains(service),
        }
    }

    /// True for a named selection with no names
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Named(names) if names.is_empty())
    }
}

/// Read-only settings for one synchronization pass
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Services to sync
    pub services: ServiceSelection,
    /// Rewrite answer for every domain
    pub target: IpAddr,
    /// Maximum in-flight domain-file fetches
    pub concurrency: usize,
    /// Per-request timeout
    pub timeout: Duration,
}
