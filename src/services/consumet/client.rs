//! Consumet API Client
//!
//! HTTP client for the `meta` endpoints of a Consumet-compatible API.

use super::types::*;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::metrics;

/// Anime metadata and episode sources, as seen by the watch page
#[async_trait]
pub trait AnimeApi: Send + Sync {
    /// Fetch metadata and the episode list of an anime
    async fn get_anime_info(&self, id: &str, provider: &str) -> Result<AnimeInfo, ApiError>;

    /// Fetch streaming sources for one episode
    async fn get_episode_streaming(
        &self,
        episode_id: &str,
        provider: &str,
    ) -> Result<StreamingData, ApiError>;
}

/// Consumet API Client
pub struct ConsumetClient {
    http: Client,
    base_url: String,
    meta: String,
}

impl ConsumetClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - API root (e.g., "https://api.consumet.org")
    /// * `meta` - Metadata source segment (e.g., "anilist")
    /// * `timeout` - Per-request timeout
    /// * `user_agent` - User-Agent header sent upstream
    pub fn new(
        base_url: &str,
        meta: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            meta: meta.trim_matches('/').to_string(),
        })
    }

    fn info_url(&self, id: &str, provider: &str) -> String {
        format!(
            "{}/meta/{}/info/{}?provider={}",
            self.base_url,
            self.meta,
            urlencoding::encode(id),
            urlencoding::encode(provider)
        )
    }

    fn watch_url(&self, episode_id: &str, provider: &str) -> String {
        format!(
            "{}/meta/{}/watch/{}?provider={}",
            self.base_url,
            self.meta,
            urlencoding::encode(episode_id),
            urlencoding::encode(provider)
        )
    }

    /// GET a JSON document, mapping transport and status failures
    async fn get<T: DeserializeOwned>(&self, endpoint: &str, url: &str) -> Result<T, ApiError> {
        debug!(endpoint, url, "Consumet API request");

        let result = self.fetch(url).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(ApiError::NotFound) => "not_found",
            Err(ApiError::Timeout) => "timeout",
            Err(_) => "error",
        };
        metrics::UPSTREAM_REQUESTS
            .with_label_values(&[endpoint, outcome])
            .inc();

        result
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            warn!("Consumet API returned {} for {}", status, url);
            return Err(ApiError::Http(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        parse_body(&text).map_err(|e| {
            if let ApiError::Parse(ref msg) = e {
                error!("Failed to parse Consumet response from {}: {}", url, msg);
                debug!("Response text: {}", text.chars().take(500).collect::<String>());
            }
            e
        })
    }
}

/// Decode a response body, treating empty bodies as missing data
fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(ApiError::EmptyResponse);
    }

    // Some deployments answer 200 with {"message": "..."} on lookup failures
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed)
    {
        if map.len() == 1 && map.contains_key("message") {
            return Err(ApiError::NotFound);
        }
    }

    serde_json::from_str(trimmed).map_err(|e| ApiError::Parse(e.to_string()))
}

#[async_trait]
impl AnimeApi for ConsumetClient {
    async fn get_anime_info(&self, id: &str, provider: &str) -> Result<AnimeInfo, ApiError> {
        let url = self.info_url(id, provider);
        self.get("info", &url).await
    }

    async fn get_episode_streaming(
        &self,
        episode_id: &str,
        provider: &str,
    ) -> Result<StreamingData, ApiError> {
        let url = self.watch_url(episode_id, provider);
        self.get("watch", &url).await
    }
}

/// Consumet API error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Network/connection error
    #[error("Network error: {0}")]
    Network(String),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Resource does not exist upstream
    #[error("Not found")]
    NotFound,
    /// HTTP error (non-2xx status)
    #[error("HTTP error: {0}")]
    Http(u16),
    /// JSON parsing error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Empty response from server
    #[error("Empty response")]
    EmptyResponse,
}
