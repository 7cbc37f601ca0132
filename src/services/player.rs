use crate::models::{PlaybackMode, PlayerArea, PlayerSource, PlayerSubtitle, PlayerView};
use crate::services::consumet::{StreamSource, StreamingData, SubtitleTrack};
use crate::services::watch::{StreamStatus, WatchController};

/// Provider whose source URLs play without going through the stream proxy
pub const DIRECT_PROVIDER: &str = "gogoanime";

/// Path of the subtitle proxy endpoint
pub const SUBTITLES_PATH: &str = "/api/subtitles";

/// Route a source URL through the stream proxy
pub fn proxied_stream_url(proxy_base: &str, url: &str, referer: Option<&str>) -> String {
    let separator = if proxy_base.contains('?') { '&' } else { '?' };
    let mut proxied = format!("{}{}url={}", proxy_base, separator, urlencoding::encode(url));
    if let Some(referer) = referer {
        proxied.push_str("&referer=");
        proxied.push_str(&urlencoding::encode(referer));
    }
    proxied
}

/// Subtitle URL served through our own subtitle endpoint
pub fn subtitle_proxy_url(url: &str) -> String {
    format!("{}?url={}", SUBTITLES_PATH, urlencoding::encode(url))
}

fn player_source(
    source: &StreamSource,
    provider: &str,
    proxy_base: &str,
    referer: Option<&str>,
) -> PlayerSource {
    let label = source
        .quality
        .as_deref()
        .filter(|q| !q.trim().is_empty())
        .unwrap_or("default")
        .to_string();

    let url = if provider == DIRECT_PROVIDER {
        source.url.clone()
    } else {
        proxied_stream_url(proxy_base, &source.url, referer)
    };

    PlayerSource { label, url }
}

fn player_subtitle(track: &SubtitleTrack) -> PlayerSubtitle {
    PlayerSubtitle {
        lang: track.lang.clone(),
        url: subtitle_proxy_url(&track.url),
    }
}

/// Build player inputs for the current episode from its streaming data
pub fn player_view(
    controller: &WatchController,
    data: &StreamingData,
    proxy_base: &str,
) -> PlayerView {
    let provider = controller.provider();
    let referer = data.headers.referer.as_deref();

    let poster = controller
        .current_episode()
        .and_then(|e| e.image.clone())
        .or_else(|| controller.info().preview_image().map(str::to_string));

    PlayerView {
        mode: controller.mode(),
        sources: data
            .sources
            .iter()
            .map(|s| player_source(s, provider, proxy_base, referer))
            .collect(),
        // Tracks without a language cannot be offered in the selector
        subtitles: data
            .subtitles
            .iter()
            .filter(|t| !t.lang.trim().is_empty())
            .map(player_subtitle)
            .collect(),
        poster,
        intro: data.intro,
        iframe_url: data.iframe_url().map(str::to_string),
        has_next: controller.has_next(),
        next_episode_id: controller.next_episode().map(|e| e.id.clone()),
    }
}

/// Derive the player area from the controller's selection and streaming state
pub fn player_area(controller: &WatchController, proxy_base: &str) -> PlayerArea {
    match controller.status() {
        StreamStatus::NoEpisode => PlayerArea::NoEpisode,
        StreamStatus::Pending => PlayerArea::Loading,
        StreamStatus::Failed(e) => PlayerArea::Failed {
            message: e.to_string(),
        },
        StreamStatus::Loaded(data) => {
            let playable = match controller.mode() {
                PlaybackMode::Iframe => true,
                PlaybackMode::Native => !data.sources.is_empty(),
            };
            if playable {
                PlayerArea::Ready {
                    player: player_view(controller, data, proxy_base),
                }
            } else {
                PlayerArea::NoSources
            }
        }
    }
}
