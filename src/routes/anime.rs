use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{upstream_error, JsonError};
use crate::models::StreamKey;
use crate::services::consumet::{AnimeInfo, StreamingData};
use crate::AppState;

#[derive(Deserialize, Default)]
pub struct ProviderQuery {
    pub provider: Option<String>,
}

/// GET /api/anime/:id?provider=<name> - cached anime metadata
pub async fn get_anime_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ProviderQuery>,
) -> Result<Json<AnimeInfo>, JsonError> {
    let provider = state.config.resolve_provider(query.provider.as_deref());
    let info = state.anime_info(&id, &provider).await.map_err(|e| {
        tracing::warn!("Anime info {} ({}) failed: {}", id, provider, e);
        upstream_error(&e)
    })?;

    Ok(Json(info.as_ref().clone()))
}

/// GET /api/episodes/:episode_id/streaming?provider=<name> - cached episode sources
pub async fn get_episode_streaming(
    State(state): State<Arc<AppState>>,
    Path(episode_id): Path<String>,
    Query(query): Query<ProviderQuery>,
) -> Result<Json<StreamingData>, JsonError> {
    let provider = state.config.resolve_provider(query.provider.as_deref());
    let key = StreamKey::new(episode_id, provider);

    let data = state.streaming(&key).await.map_err(|e| {
        tracing::warn!(
            "Streaming for {} ({}) failed: {}",
            key.episode_id,
            key.provider,
            e
        );
        upstream_error(&e)
    })?;

    Ok(Json(data.as_ref().clone()))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{get, state_with, FakeApi};
    use crate::services::consumet::ApiError;
    use crate::services::watch::tests::{anime, streaming};
    use axum::http::StatusCode;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_anime_info_json() {
        let api = Arc::new(FakeApi::default().with_anime("gogoanime", anime("bleach", 2)));
        let (status, body) = get(state_with(api), "/api/anime/bleach").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["id"], "bleach");
        assert_eq!(json["episodes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_anime_info_not_found() {
        let state = state_with(Arc::new(FakeApi::default()));
        let (status, body) = get(state, "/api/anime/unknown?provider=zoro").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("error"));
    }

    #[tokio::test]
    async fn test_streaming_is_cached_per_episode_and_provider() {
        let api = Arc::new(FakeApi::default().with_stream(
            "bleach-episode-1",
            Ok(streaming("https://cdn.test/b1.m3u8", None)),
        ));
        let state = state_with(api.clone());

        let (status, body) = get(state.clone(), "/api/episodes/bleach-episode-1/streaming").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("https://cdn.test/b1.m3u8"));

        get(state.clone(), "/api/episodes/bleach-episode-1/streaming?provider=gogoanime").await;
        assert_eq!(api.streaming_calls(), 1);

        get(state, "/api/episodes/bleach-episode-1/streaming?provider=zoro").await;
        assert_eq!(api.streaming_calls(), 2);
    }

    #[tokio::test]
    async fn test_streaming_upstream_failure() {
        let api = Arc::new(FakeApi::default().with_stream("x", Err(ApiError::Timeout)));
        let (status, _) = get(state_with(api), "/api/episodes/x/streaming").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
