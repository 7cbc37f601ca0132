//! Consumet API Types
//!
//! Response shapes for the `meta/{provider}/info` and `meta/{provider}/watch`
//! endpoints. Most fields are optional because providers fill them unevenly.

use serde::{Deserialize, Deserializer, Serialize};

/// Upstream ids arrive as strings or numbers depending on the provider
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Optional numbers that some providers send as strings ("24", "?")
fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawNumber {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<RawNumber>::deserialize(deserializer)? {
        Some(RawNumber::Number(n)) if n >= 0.0 => Some(n as u32),
        Some(RawNumber::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Treat an explicit `null` like a missing field
fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ============================================================================
// Anime info
// ============================================================================

/// Anime title, either localized or a single string
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AnimeTitle {
    Localized {
        #[serde(default)]
        romaji: Option<String>,
        #[serde(default)]
        english: Option<String>,
        #[serde(default)]
        native: Option<String>,
        #[serde(default, rename = "userPreferred")]
        user_preferred: Option<String>,
    },
    Plain(String),
}

impl AnimeTitle {
    /// Display title: english, romaji, user preferred, then native
    pub fn display(&self) -> &str {
        match self {
            AnimeTitle::Plain(title) if !title.trim().is_empty() => title,
            AnimeTitle::Plain(_) => "Unknown",
            AnimeTitle::Localized {
                romaji,
                english,
                native,
                user_preferred,
            } => [english, romaji, user_preferred, native]
                .into_iter()
                .filter_map(|t| t.as_deref())
                .find(|t| !t.trim().is_empty())
                .unwrap_or("Unknown"),
        }
    }
}

impl Default for AnimeTitle {
    fn default() -> Self {
        AnimeTitle::Plain(String::new())
    }
}

/// Full anime metadata from the info endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeInfo {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub title: AnimeTitle,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub release_date: Option<u32>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Minutes per episode
    #[serde(default, deserialize_with = "de_opt_number")]
    pub duration: Option<u32>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub episodes: Vec<Episode>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub recommendations: Vec<Recommendation>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub next_airing_episode: Option<NextAiringEpisode>,
}

impl AnimeInfo {
    /// Position of an episode in the list
    pub fn episode_index(&self, episode_id: &str) -> Option<usize> {
        self.episodes.iter().position(|e| e.id == episode_id)
    }

    /// Best image for page previews: cover, then poster
    pub fn preview_image(&self) -> Option<&str> {
        self.cover.as_deref().or(self.image.as_deref())
    }
}

/// Single episode entry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub number: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
}

impl Episode {
    /// Label for lists: "Episode N" or the title
    pub fn label(&self, index: usize) -> String {
        match self.number {
            Some(n) => format!("Episode {}", n),
            None => format!("Episode {}", index + 1),
        }
    }
}

/// "More like this" entry
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub title: AnimeTitle,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub episodes: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub rating: Option<u32>,
}

/// Related entry (sequel, prequel, side story, ...)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub relation_type: Option<String>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub title: AnimeTitle,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub episodes: Option<u32>,
}

/// Next airing marker for ongoing shows
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextAiringEpisode {
    #[serde(default, deserialize_with = "de_opt_number")]
    pub episode: Option<u32>,
    /// Unix seconds
    #[serde(default)]
    pub airing_time: Option<i64>,
    /// Seconds until airing
    #[serde(default)]
    pub time_until_airing: Option<i64>,
}

// ============================================================================
// Episode streaming
// ============================================================================

/// Streaming sources for one episode
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    #[serde(default, deserialize_with = "de_null_default")]
    pub headers: StreamingHeaders,
    #[serde(default, deserialize_with = "de_null_default")]
    pub sources: Vec<StreamSource>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub subtitles: Vec<SubtitleTrack>,
    #[serde(default)]
    pub intro: Option<IntroMarker>,
    #[serde(default)]
    pub download: Option<String>,
}

impl StreamingData {
    /// Referer usable as an iframe embed URL
    pub fn iframe_url(&self) -> Option<&str> {
        self.headers
            .referer
            .as_deref()
            .filter(|r| r.starts_with("http://") || r.starts_with("https://"))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamingHeaders {
    #[serde(default, rename = "Referer")]
    pub referer: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSource {
    pub url: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default, rename = "isM3U8", deserialize_with = "de_null_default")]
    pub is_m3u8: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubtitleTrack {
    pub url: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub lang: String,
}

/// Opening sequence bounds in seconds
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct IntroMarker {
    pub start: f64,
    pub end: f64,
}
