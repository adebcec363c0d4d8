//! HTTP catalogue client

use super::{Catalogue, CatalogueEntry, CatalogueSource, DomainFileSource};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{ensure_success, read_json, read_text};
use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, instrument};

/// Fetches the index and domain files over HTTP
///
/// The index and every domain file resolve against the same base URL.
#[derive(Debug, Clone)]
pub struct HttpCatalogue {
    client: Client,
    base_url: Url,
    index: String,
}

impl HttpCatalogue {
    /// Create a client rooted at `base_url`
    pub fn new(client: Client, base_url: Url, index: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            index: index.into(),
        }
    }

    /// Create a client from the `[catalogue]` section
    pub fn from_config(client: Client, config: &Config) -> Result<Self> {
        Ok(Self::new(
            client,
            config.catalogue_base_url()?,
            config.catalogue.index.clone(),
        ))
    }

    /// Resolve a catalogue-relative path
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::format(self.base_url.as_str(), format!("bad path '{path}': {e}")))
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;
        ensure_success(url.as_str(), response)
    }
}

#[async_trait]
impl CatalogueSource for HttpCatalogue {
    #[instrument(skip(self), fields(index = %self.index))]
    async fn fetch_catalogue(&self) -> Result<Vec<CatalogueEntry>> {
        let url = self.resolve(&self.index)?;
        let response = self.get(&url).await?;
        let catalogue: Catalogue = read_json(url.as_str(), response).await?;

        debug!(services = catalogue.cache_domains.len(), "Parsed catalogue");
        Ok(catalogue.cache_domains)
    }
}

#[async_trait]
impl DomainFileSource for HttpCatalogue {
    async fn fetch_domain_file(&self, path: &str) -> Result<String> {
        let url = self.resolve(path)?;
        let response = self.get(&url).await?;
        read_text(url.as_str(), response).await
    }
}
