//! AdGuard Home filtering API

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{ensure_success, read_json};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, instrument};

/// Status endpoint, relative to the API base URL
pub const STATUS_PATH: &str = "/control/filtering/status";

/// Rule replacement endpoint, relative to the API base URL
pub const SET_RULES_PATH: &str = "/control/filtering/set_rules";

/// Filtering state as reported by AdGuard Home
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStatus {
    /// Free-form user rules, in order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user_rules: Vec<String>,
    /// Whether filtering is switched on
    #[serde(default)]
    pub enabled: bool,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize)]
struct SetRulesRequest<'a> {
    rules: &'a [String],
}

/// The two filtering calls the reconciler needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FilteringApi: Send + Sync {
    /// Read the current filtering status, including user rules
    async fn filtering_status(&self) -> Result<FilterStatus>;

    /// Replace the whole user-rule list in one call
    async fn set_rules(&self, rules: Vec<String>) -> Result<()>;
}

/// HTTP client for the AdGuard Home control API, using basic auth
#[derive(Clone)]
pub struct AdGuardClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for AdGuardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdGuardClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AdGuardClient {
    /// Create a client for the API at `base_url`
    pub fn new(
        client: Client,
        base_url: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create a client from the `[adguard]` section
    pub fn from_config(client: Client, config: &Config) -> Result<Self> {
        let url = config.adguard_url()?;
        Ok(Self::new(
            client,
            url.as_str(),
            config.adguard.username.clone(),
            config.adguard.password.clone(),
        ))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl FilteringApi for AdGuardClient {
    #[instrument(skip(self))]
    async fn filtering_status(&self) -> Result<FilterStatus> {
        let url = self.endpoint(STATUS_PATH);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| Error::transport(&url, e))?;
        let response = ensure_success(&url, response)?;
        let status: FilterStatus = read_json(&url, response).await?;

        debug!(rules = status.user_rules.len(), enabled = status.enabled, "Read filtering status");
        Ok(status)
    }

    #[instrument(skip(self, rules), fields(rules = rules.len()))]
    async fn set_rules(&self, rules: Vec<String>) -> Result<()> {
        let url = self.endpoint(SET_RULES_PATH);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&SetRulesRequest { rules: &rules })
            .send()
            .await
            .map_err(|e| Error::transport(&url, e))?;
        ensure_success(&url, response)?;
        Ok(())
    }
}
