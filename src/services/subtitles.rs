//! Subtitle fetching and normalization
//!
//! Players only understand WebVTT, while providers serve a mix of VTT and
//! SRT. Tracks are fetched server-side (bypassing CORS), capped in size and
//! converted to WebVTT when needed.

use futures::StreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use url::Url;

lazy_static! {
    /// SRT timestamp with comma decimal separator (00:01:02,345)
    static ref SRT_TIMESTAMP: Regex = Regex::new(r"(\d{1,2}:\d{2}:\d{2}),(\d{3})").unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum SubtitleError {
    #[error("Subtitle request timed out")]
    Timeout,
    #[error("Failed to fetch subtitle: {0}")]
    Network(String),
    #[error("Subtitle server returned {0}")]
    Upstream(u16),
    #[error("Subtitle exceeds {0} bytes")]
    TooLarge(usize),
    #[error("Unsupported subtitle format")]
    Unsupported,
}

impl From<reqwest::Error> for SubtitleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SubtitleError::Timeout
        } else {
            SubtitleError::Network(e.to_string())
        }
    }
}

/// Download a subtitle body, refusing anything over `max_bytes`
pub async fn fetch_subtitle(
    client: &Client,
    url: Url,
    referer: Option<&str>,
    max_bytes: usize,
) -> Result<String, SubtitleError> {
    let mut request = client.get(url.clone());
    if let Some(referer) = referer {
        request = request.header(reqwest::header::REFERER, referer);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        tracing::warn!("Subtitle upstream {} returned {}", url, status);
        return Err(SubtitleError::Upstream(status.as_u16()));
    }

    if let Some(length) = response.content_length() {
        if length as usize > max_bytes {
            return Err(SubtitleError::TooLarge(max_bytes));
        }
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > max_bytes {
            return Err(SubtitleError::TooLarge(max_bytes));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Convert a subtitle document to WebVTT
pub fn to_webvtt(body: &str) -> Result<String, SubtitleError> {
    let body = body.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = body.trim_start();

    if trimmed.starts_with("WEBVTT") {
        return Ok(trimmed.to_string());
    }
    if trimmed.starts_with("[Script Info]") {
        return Err(SubtitleError::Unsupported);
    }
    if !trimmed.lines().any(|line| line.contains("-->")) {
        return Err(SubtitleError::Unsupported);
    }

    let mut vtt = String::with_capacity(body.len() + 8);
    vtt.push_str("WEBVTT\n\n");
    for line in trimmed.lines() {
        if line.contains("-->") {
            vtt.push_str(&SRT_TIMESTAMP.replace_all(line, "$1.$2"));
        } else {
            vtt.push_str(line);
        }
        vtt.push('\n');
    }
    Ok(vtt)
}
