use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{json_error, parse_http_url, JsonError};
use crate::services::subtitles::{fetch_subtitle, to_webvtt, SubtitleError};
use crate::AppState;

#[derive(Deserialize)]
pub struct SubtitleQuery {
    pub url: String,
    #[serde(default)]
    pub referer: Option<String>,
}

fn subtitle_error(err: &SubtitleError) -> JsonError {
    let status = match err {
        SubtitleError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        SubtitleError::Network(_) | SubtitleError::Upstream(_) => StatusCode::BAD_GATEWAY,
        SubtitleError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        SubtitleError::Unsupported => StatusCode::UNSUPPORTED_MEDIA_TYPE,
    };
    json_error(status, err.to_string())
}

/// GET /api/subtitles?url=<encoded>&referer=<optional>
/// Fetch a subtitle track server-side and serve it as WebVTT.
pub async fn subtitle_proxy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubtitleQuery>,
) -> Result<Response, JsonError> {
    let url = parse_http_url(&query.url)
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "Invalid url parameter"))?;
    let referer = query.referer.as_deref().filter(|r| !r.is_empty());

    let body = fetch_subtitle(&state.http, url, referer, state.config.max_subtitle_bytes)
        .await
        .map_err(|e| {
            tracing::warn!("Subtitle proxy failed for {}: {}", query.url, e);
            subtitle_error(&e)
        })?;
    let vtt = to_webvtt(&body).map_err(|e| subtitle_error(&e))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/vtt; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        vtt,
    )
        .into_response())
}
