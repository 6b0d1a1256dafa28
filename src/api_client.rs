//! Client for the remote security API.
//!
//! The remote API serves three read-only collections the dashboard
//! consumes: alerts, decisions (with or without expired entries), and a
//! small configuration object. The client performs no retries; a failed
//! request fails the whole refresh cycle and the dashboard keeps showing
//! its previous data (see [`crate::refresh`]).

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::model::{Alert, Decision, RemoteConfig};

/// Base URL used when `PALISADE_API_URL` is not set.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8080/v1";

/// Why a fetch failed. Transport and decode failures both surface as a
/// degraded dashboard, but logs should tell them apart.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Client for the remote security API.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base, including the version prefix.
    /// * `api_key` - Optional bearer token for authenticated deployments.
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Create an unauthenticated client against a custom base URL
    /// (for testing).
    pub fn with_base_url(base_url: &str) -> Self {
        Self::new(base_url, None)
    }

    /// Build a request with optional authentication.
    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(url);
        if let Some(key) = &self.api_key {
            req.header("Authorization", format!("Bearer {}", key))
        } else {
            req
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self
            .build_request(url)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        response.json::<T>().await.map_err(FetchError::Decode)
    }

    /// Fetch the raw alert collection.
    pub async fn get_alerts(&self) -> Result<Vec<Alert>, FetchError> {
        let url = format!("{}/alerts", self.base_url);
        self.get_json(&url).await
    }

    /// Fetch the decision collection, with or without expired entries.
    pub async fn get_decisions(&self, include_expired: bool) -> Result<Vec<Decision>, FetchError> {
        let url = format!(
            "{}/decisions?include_expired={}",
            self.base_url, include_expired
        );
        self.get_json(&url).await
    }

    /// Fetch the dashboard configuration (lookback window length).
    pub async fn get_config(&self) -> Result<RemoteConfig, FetchError> {
        let url = format!("{}/config", self.base_url);
        self.get_json(&url).await
    }
}
