//! Watch page controller
//!
//! Selection state for one viewer of one anime: the current episode, the
//! playback mode and the provider. Streaming lookups are tagged with a
//! [`FetchTicket`]; a result is only applied while its ticket still matches
//! the selection, so a slow response for a previously selected episode can
//! never replace the data of the current one.

use std::sync::Arc;

use crate::metrics;
use crate::models::{PlaybackMode, StreamKey};
use crate::services::consumet::{AnimeInfo, ApiError, Episode, StreamingData};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WatchError {
    #[error("Episode {0} is not part of this anime")]
    UnknownEpisode(String),
}

/// Tag for an in-flight streaming lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: StreamKey,
    generation: u64,
}

/// Result of handing a finished lookup back to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

/// Streaming state of the current selection
#[derive(Debug)]
pub enum StreamStatus<'a> {
    NoEpisode,
    Pending,
    Failed(&'a ApiError),
    Loaded(&'a StreamingData),
}

#[derive(Debug)]
enum Outcome {
    Loaded(Arc<StreamingData>),
    Failed(ApiError),
}

#[derive(Debug)]
pub struct WatchController {
    info: Arc<AnimeInfo>,
    provider: String,
    current: Option<usize>,
    mode: PlaybackMode,
    generation: u64,
    outcome: Option<Outcome>,
}

impl WatchController {
    /// Start on the first episode, or with nothing selected when there are none
    pub fn new(info: Arc<AnimeInfo>, provider: impl Into<String>) -> Self {
        let current = if info.episodes.is_empty() { None } else { Some(0) };
        Self {
            info,
            provider: provider.into(),
            current,
            mode: PlaybackMode::Native,
            generation: 0,
            outcome: None,
        }
    }

    pub fn info(&self) -> &AnimeInfo {
        &self.info
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.current.and_then(|i| self.info.episodes.get(i))
    }

    pub fn next_episode(&self) -> Option<&Episode> {
        self.current.and_then(|i| self.info.episodes.get(i + 1))
    }

    pub fn has_next(&self) -> bool {
        self.next_episode().is_some()
    }

    /// Replace the current episode
    pub fn select_episode(&mut self, episode_id: &str) -> Result<(), WatchError> {
        let index = self
            .info
            .episode_index(episode_id)
            .ok_or_else(|| WatchError::UnknownEpisode(episode_id.to_string()))?;
        self.set_current(Some(index));
        Ok(())
    }

    /// Move to the episode after the current one; false when there is none
    pub fn advance_to_next_episode(&mut self) -> bool {
        match self.current {
            Some(i) if i + 1 < self.info.episodes.len() => {
                self.set_current(Some(i + 1));
                true
            }
            _ => false,
        }
    }

    /// Switch provider with the info loaded for it; selection goes back to episode 0
    pub fn change_provider(&mut self, provider: impl Into<String>, info: Arc<AnimeInfo>) {
        self.provider = provider.into();
        self.info = info;
        let first = if self.info.episodes.is_empty() { None } else { Some(0) };
        self.set_current(first);
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    /// Requested mode, downgraded to native while no embed URL is known
    pub fn mode(&self) -> PlaybackMode {
        match (self.mode, self.status()) {
            (PlaybackMode::Iframe, StreamStatus::Loaded(data)) if data.iframe_url().is_some() => {
                PlaybackMode::Iframe
            }
            _ => PlaybackMode::Native,
        }
    }

    pub fn requested_mode(&self) -> PlaybackMode {
        self.mode
    }

    fn set_current(&mut self, index: Option<usize>) {
        self.current = index;
        self.generation += 1;
        self.outcome = None;
    }

    /// Ticket for the streaming lookup of the current episode; `None` when nothing is selected
    pub fn fetch_ticket(&self) -> Option<FetchTicket> {
        self.current_episode().map(|episode| FetchTicket {
            key: StreamKey::new(episode.id.as_str(), self.provider.as_str()),
            generation: self.generation,
        })
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation
            && self.fetch_ticket().map_or(false, |t| t.key == ticket.key)
    }

    /// Apply a finished lookup unless the selection has moved on since the ticket was issued
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Arc<StreamingData>, ApiError>,
    ) -> Completion {
        if !self.is_current(ticket) {
            metrics::STALE_RESPONSES.inc();
            tracing::info!(
                episode_id = %ticket.key.episode_id,
                provider = %ticket.key.provider,
                "Discarding stale streaming response"
            );
            return Completion::Stale;
        }

        self.outcome = Some(match result {
            Ok(data) => Outcome::Loaded(data),
            Err(e) => Outcome::Failed(e),
        });
        Completion::Applied
    }

    pub fn status(&self) -> StreamStatus<'_> {
        if self.current.is_none() {
            return StreamStatus::NoEpisode;
        }
        match &self.outcome {
            None => StreamStatus::Pending,
            Some(Outcome::Failed(e)) => StreamStatus::Failed(e),
            Some(Outcome::Loaded(data)) => StreamStatus::Loaded(data),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::consumet::{AnimeTitle, StreamSource};

    pub(crate) fn anime(id: &str, episodes: usize) -> AnimeInfo {
        AnimeInfo {
            id: id.to_string(),
            title: AnimeTitle::Plain(format!("Anime {}", id)),
            image: Some(format!("https://img.test/{}.jpg", id)),
            cover: None,
            description: Some("A <b>bold</b> story".to_string()),
            status: Some("Completed".to_string()),
            release_date: Some(2020),
            kind: Some("TV".to_string()),
            duration: Some(24),
            episodes: (0..episodes)
                .map(|i| Episode {
                    id: format!("{}-episode-{}", id, i + 1),
                    number: Some(i as u32 + 1),
                    title: Some(format!("Episode title {}", i + 1)),
                    description: None,
                    image: Some(format!("https://img.test/{}/{}.jpg", id, i + 1)),
                    air_date: None,
                })
                .collect(),
            recommendations: Vec::new(),
            relations: Vec::new(),
            next_airing_episode: None,
        }
    }

    pub(crate) fn streaming(url: &str, referer: Option<&str>) -> StreamingData {
        let mut data = StreamingData::default();
        data.sources.push(StreamSource {
            url: url.to_string(),
            quality: Some("720p".to_string()),
            is_m3u8: true,
        });
        data.headers.referer = referer.map(str::to_string);
        data
    }

    fn controller(episodes: usize) -> WatchController {
        WatchController::new(Arc::new(anime("naruto", episodes)), "gogoanime")
    }

    #[test]
    fn test_initial_selection_is_first_episode() {
        let c = controller(12);
        assert_eq!(c.current_index(), Some(0));
        assert_eq!(c.current_episode().unwrap().id, "naruto-episode-1");
        assert_eq!(c.mode(), PlaybackMode::Native);
    }

    #[test]
    fn test_no_episodes_means_no_selection_and_no_ticket() {
        let c = controller(0);
        assert_eq!(c.current_index(), None);
        assert!(c.fetch_ticket().is_none());
        assert!(matches!(c.status(), StreamStatus::NoEpisode));
    }

    #[test]
    fn test_select_episode() {
        let mut c = controller(3);
        c.select_episode("naruto-episode-3").unwrap();
        assert_eq!(c.current_index(), Some(2));

        let err = c.select_episode("bleach-episode-1").unwrap_err();
        assert_eq!(err, WatchError::UnknownEpisode("bleach-episode-1".into()));
        assert_eq!(c.current_index(), Some(2));
    }

    #[test]
    fn test_advance_to_next_episode() {
        let mut c = controller(3);
        assert!(c.advance_to_next_episode());
        assert_eq!(c.current_index(), Some(1));
        assert!(c.advance_to_next_episode());
        assert_eq!(c.current_index(), Some(2));
        assert!(!c.has_next());

        assert!(!c.advance_to_next_episode());
        assert_eq!(c.current_index(), Some(2));
    }

    #[test]
    fn test_advance_without_episodes_is_noop() {
        let mut c = controller(0);
        assert!(!c.advance_to_next_episode());
        assert_eq!(c.current_index(), None);
    }

    #[test]
    fn test_provider_change_resets_selection() {
        let mut c = controller(5);
        c.select_episode("naruto-episode-4").unwrap();

        c.change_provider("zoro", Arc::new(anime("naruto", 5)));
        assert_eq!(c.provider(), "zoro");
        assert_eq!(c.current_index(), Some(0));
        assert_eq!(c.fetch_ticket().unwrap().key.provider, "zoro");
    }

    #[test]
    fn test_ticket_keyed_by_episode_and_provider() {
        let c = controller(2);
        let ticket = c.fetch_ticket().unwrap();
        assert_eq!(ticket.key, StreamKey::new("naruto-episode-1", "gogoanime"));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut c = controller(3);
        let first = c.fetch_ticket().unwrap();

        c.select_episode("naruto-episode-2").unwrap();
        let second = c.fetch_ticket().unwrap();

        let late = Arc::new(streaming("https://cdn.test/ep1.m3u8", None));
        assert_eq!(c.complete(&first, Ok(late)), Completion::Stale);
        assert!(matches!(c.status(), StreamStatus::Pending));

        let fresh = Arc::new(streaming("https://cdn.test/ep2.m3u8", None));
        assert_eq!(c.complete(&second, Ok(fresh)), Completion::Applied);
        match c.status() {
            StreamStatus::Loaded(data) => {
                assert_eq!(data.sources[0].url, "https://cdn.test/ep2.m3u8")
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_reselecting_same_episode_invalidates_old_ticket() {
        let mut c = controller(2);
        let old = c.fetch_ticket().unwrap();
        c.select_episode("naruto-episode-2").unwrap();
        c.select_episode("naruto-episode-1").unwrap();

        assert_eq!(c.complete(&old, Err(ApiError::Timeout)), Completion::Stale);
        assert!(matches!(c.status(), StreamStatus::Pending));
    }

    #[test]
    fn test_failure_is_reported() {
        let mut c = controller(1);
        let ticket = c.fetch_ticket().unwrap();
        c.complete(&ticket, Err(ApiError::Http(500)));
        assert!(matches!(c.status(), StreamStatus::Failed(ApiError::Http(500))));
    }

    #[test]
    fn test_iframe_mode_requires_referer() {
        let mut c = controller(2);
        c.set_mode(PlaybackMode::Iframe);
        assert_eq!(c.mode(), PlaybackMode::Native);

        let ticket = c.fetch_ticket().unwrap();
        c.complete(&ticket, Ok(Arc::new(streaming("https://cdn.test/a.m3u8", None))));
        assert_eq!(c.mode(), PlaybackMode::Native);
        assert_eq!(c.requested_mode(), PlaybackMode::Iframe);

        c.advance_to_next_episode();
        let ticket = c.fetch_ticket().unwrap();
        let data = streaming("https://cdn.test/b.m3u8", Some("https://embed.test/b"));
        c.complete(&ticket, Ok(Arc::new(data)));
        assert_eq!(c.mode(), PlaybackMode::Iframe);
    }
}
