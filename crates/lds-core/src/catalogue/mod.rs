//! Cache-domains catalogue
//!
//! The catalogue is a JSON index naming every service together with the
//! relative paths of its domain files:
//!
//! ```json
//! { "cache_domains": [ { "name": "steam", "domain_files": ["steam.txt"] } ] }
//! ```

mod http;

pub use self::http::HttpCatalogue;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One named service and its domain-file locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    /// Service name, e.g. `steam`
    pub name: String,
    /// Domain-file paths relative to the catalogue base URL
    #[serde(default)]
    pub domain_files: Vec<String>,
}

impl CatalogueEntry {
    /// Create an entry
    pub fn new<I, S>(name: impl Into<String>, domain_files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            domain_files: domain_files.into_iter().map(Into::into).collect(),
        }
    }
}

/// The index document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalogue {
    /// All services, in catalogue order
    pub cache_domains: Vec<CatalogueEntry>,
}

/// Source of the catalogue index
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogueSource: Send + Sync {
    /// Fetch and parse the index
    async fn fetch_catalogue(&self) -> Result<Vec<CatalogueEntry>>;
}

/// Source of individual domain files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainFileSource: Send + Sync {
    /// Fetch the raw text of the domain file at `path`
    async fn fetch_domain_file(&self, path: &str) -> Result<String>;
}
