use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::consumet::IntroMarker;

/// How the current episode is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Built-in HLS/MP4 player fed with source URLs
    Native,
    /// Provider's embed page in an iframe
    Iframe,
}

impl Default for PlaybackMode {
    fn default() -> Self {
        Self::Native
    }
}

impl PlaybackMode {
    /// Parse a query value; anything unrecognized is native playback
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("iframe") => Self::Iframe,
            _ => Self::Native,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMode::Native => "native",
            PlaybackMode::Iframe => "iframe",
        }
    }
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one streaming lookup: episode plus provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamKey {
    pub episode_id: String,
    pub provider: String,
}

impl StreamKey {
    pub fn new(episode_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            episode_id: episode_id.into(),
            provider: provider.into(),
        }
    }
}

/// Source entry handed to the native player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSource {
    pub label: String,
    pub url: String,
}

/// Subtitle track handed to the native player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSubtitle {
    pub lang: String,
    pub url: String,
}

/// Fully resolved player inputs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub mode: PlaybackMode,
    pub sources: Vec<PlayerSource>,
    pub subtitles: Vec<PlayerSubtitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro: Option<IntroMarker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iframe_url: Option<String>,
    pub has_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_episode_id: Option<String>,
}

/// What the player area shows; exactly one state at a time
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PlayerArea {
    NoEpisode,
    Loading,
    Failed { message: String },
    NoSources,
    Ready { player: PlayerView },
}

impl PlayerArea {
    /// Inline message for every non-ready state
    pub fn message(&self) -> Option<&str> {
        match self {
            PlayerArea::NoEpisode => Some("Please select the episode"),
            PlayerArea::Loading => Some("Loading episode data..."),
            PlayerArea::Failed { .. } => Some("Failed to load episode sources"),
            PlayerArea::NoSources => Some("No sources available for this episode"),
            PlayerArea::Ready { .. } => None,
        }
    }
}

/// Snapshot of an interactive watch session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub anime_id: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_index: Option<usize>,
    pub episode_count: usize,
    pub mode: PlaybackMode,
    pub has_next: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_query() {
        assert_eq!(PlaybackMode::from_query(Some("iframe")), PlaybackMode::Iframe);
        assert_eq!(PlaybackMode::from_query(Some(" IFRAME ")), PlaybackMode::Iframe);
        assert_eq!(PlaybackMode::from_query(Some("native")), PlaybackMode::Native);
        assert_eq!(PlaybackMode::from_query(Some("flash")), PlaybackMode::Native);
        assert_eq!(PlaybackMode::from_query(None), PlaybackMode::Native);
    }

    #[test]
    fn test_player_area_serializes_with_state_tag() {
        let json = serde_json::to_value(PlayerArea::Failed {
            message: "HTTP error: 500".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["message"], "HTTP error: 500");

        let json = serde_json::to_value(PlayerArea::NoEpisode).unwrap();
        assert_eq!(json["state"], "noEpisode");
    }
}
