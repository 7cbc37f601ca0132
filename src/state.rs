use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::models::{PlayerArea, StreamKey};
use crate::services::consumet::{AnimeApi, AnimeInfo, ApiError, StreamingData};
use crate::services::player::player_area;
use crate::services::request_cache::RequestCache;
use crate::services::sessions::{SessionHandle, SessionStore};
use crate::services::watch::WatchController;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub api: Arc<dyn AnimeApi>,
    /// Keyed by (anime id, provider)
    pub info_cache: RequestCache<(String, String), AnimeInfo>,
    pub streaming_cache: RequestCache<StreamKey, StreamingData>,
    pub sessions: SessionStore,
    /// Shared client for the subtitle and stream proxies
    pub http: reqwest::Client,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, api: Arc<dyn AnimeApi>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.proxy_timeout_ms))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            info_cache: RequestCache::new(
                "info",
                Duration::from_millis(config.info_cache_ttl_ms),
                config.cache_max_entries,
            ),
            streaming_cache: RequestCache::new(
                "streaming",
                Duration::from_millis(config.streaming_cache_ttl_ms),
                config.cache_max_entries,
            ),
            sessions: SessionStore::new(config.session_ttl_seconds),
            http,
            api,
            config,
            start_time: Instant::now(),
        })
    }

    /// Anime metadata for a provider, through the info cache
    pub async fn anime_info(&self, id: &str, provider: &str) -> Result<Arc<AnimeInfo>, ApiError> {
        let api = Arc::clone(&self.api);
        let key = (id.to_string(), provider.to_string());
        let (id, provider) = key.clone();

        self.info_cache
            .get_or_fetch(key, move || async move {
                api.get_anime_info(&id, &provider).await
            })
            .await
    }

    /// Streaming sources for one episode, through the streaming cache
    pub async fn streaming(&self, key: &StreamKey) -> Result<Arc<StreamingData>, ApiError> {
        let api = Arc::clone(&self.api);
        let StreamKey {
            episode_id,
            provider,
        } = key.clone();

        self.streaming_cache
            .get_or_fetch(key.clone(), move || async move {
                api.get_episode_streaming(&episode_id, &provider).await
            })
            .await
    }

    /// Resolve streaming data for the controller's selection and derive the player area
    ///
    /// No lookup is issued when nothing is selected.
    pub async fn resolve_player(&self, controller: &mut WatchController) -> PlayerArea {
        if let Some(ticket) = controller.fetch_ticket() {
            let result = self.streaming(&ticket.key).await;
            log_streaming_failure(&ticket.key, &result);
            controller.complete(&ticket, result);
        }
        player_area(controller, &self.config.stream_proxy_url)
    }

    /// Same as [`resolve_player`](Self::resolve_player) for a shared session
    ///
    /// The lock is released while the lookup runs, so the viewer can change
    /// the selection meanwhile; the result is then dropped as stale.
    pub async fn resolve_session_player(&self, handle: &SessionHandle) -> PlayerArea {
        let ticket = handle.lock().await.fetch_ticket();

        if let Some(ticket) = ticket {
            let result = self.streaming(&ticket.key).await;
            log_streaming_failure(&ticket.key, &result);
            handle.lock().await.complete(&ticket, result);
        }

        let controller = handle.lock().await;
        player_area(&controller, &self.config.stream_proxy_url)
    }
}

fn log_streaming_failure(key: &StreamKey, result: &Result<Arc<StreamingData>, ApiError>) {
    if let Err(e) = result {
        tracing::warn!(
            episode_id = %key.episode_id,
            provider = %key.provider,
            "Failed to load episode sources: {}",
            e
        );
    }
}
