//! Shared HTTP plumbing
//!
//! One `reqwest::Client` per process, with the configured timeout applied to
//! every request. Status and decode failures are mapped onto [`Error`].

use crate::error::{Error, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("lancache-dns-sync/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used by every remote call
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::transport("<client>", e))
}

/// Reject non-2xx responses
pub(crate) fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Read a successful response body as JSON
pub(crate) async fn read_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| Error::transport(url, e))?;
    serde_json::from_slice(&body).map_err(|e| Error::format(url, e.to_string()))
}

/// Read a successful response body as text
pub(crate) async fn read_text(url: &str, response: Response) -> Result<String> {
    response.text().await.map_err(|e| Error::transport(url, e))
}
