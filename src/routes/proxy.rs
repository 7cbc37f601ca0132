use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{json_error, parse_http_url, JsonError};
use crate::AppState;

// reqwest 0.11 ships its own http crate version, so upstream headers are read
// with reqwest's constants and written with axum's
mod upstream {
    pub use reqwest::header::{
        ACCEPT, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG,
        LAST_MODIFIED, RANGE, REFERER,
    };
}

#[derive(Deserialize)]
pub struct StreamProxyQuery {
    pub url: String,
    #[serde(default)]
    pub referer: Option<String>,
}

/// Guess content type from URL
fn guess_content_type(url: &str) -> &'static str {
    let lower = url.to_lowercase();
    if lower.contains(".m3u8") {
        "application/vnd.apple.mpegurl"
    } else if lower.contains(".mp4") {
        "video/mp4"
    } else if lower.contains(".vtt") {
        "text/vtt"
    } else {
        "video/MP2T"
    }
}

/// Copy a header from the upstream response if it is a valid value for ours
fn copy_header(
    from: &reqwest::header::HeaderMap,
    name: reqwest::header::HeaderName,
    to: &mut HeaderMap,
    as_name: header::HeaderName,
) {
    if let Some(value) = from
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| HeaderValue::from_str(v).ok())
    {
        to.insert(as_name, value);
    }
}

/// GET /api/proxy/stream?url=<encoded>&referer=<optional>
/// Streams manifests and segments for providers whose CDNs require a referer
/// or block cross-origin playback. Nothing is buffered.
pub async fn stream_proxy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamProxyQuery>,
    headers: HeaderMap,
) -> Result<Response, JsonError> {
    let url = parse_http_url(&query.url)
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "Invalid url parameter"))?;

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("*/*");
    let mut request = state.http.get(url.clone()).header(upstream::ACCEPT, accept);

    if let Some(range) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        request = request.header(upstream::RANGE, range);
    }
    if let Some(referer) = query.referer.as_deref().filter(|r| !r.is_empty()) {
        request = request.header(upstream::REFERER, referer);
    }

    let upstream_response = request.send().await.map_err(|e| {
        let status = if e.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        };
        tracing::error!("Stream proxy error for {}: {}", url, e);
        json_error(status, "Failed to proxy stream")
    })?;

    let status = StatusCode::from_u16(upstream_response.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let upstream_headers = upstream_response.headers().clone();

    let mut response_headers = HeaderMap::new();
    let content_type = upstream_headers
        .get(upstream::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static(guess_content_type(url.path())));
    response_headers.insert(header::CONTENT_TYPE, content_type);
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response_headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response_headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Length, Content-Type, Content-Range, Accept-Ranges"),
    );

    copy_header(&upstream_headers, upstream::CONTENT_LENGTH, &mut response_headers, header::CONTENT_LENGTH);
    copy_header(&upstream_headers, upstream::CONTENT_RANGE, &mut response_headers, header::CONTENT_RANGE);
    copy_header(&upstream_headers, upstream::ACCEPT_RANGES, &mut response_headers, header::ACCEPT_RANGES);
    copy_header(&upstream_headers, upstream::ETAG, &mut response_headers, header::ETAG);
    copy_header(&upstream_headers, upstream::LAST_MODIFIED, &mut response_headers, header::LAST_MODIFIED);

    let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}
