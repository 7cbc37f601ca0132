//! Consumet Integration
//!
//! Client for the anime metadata and episode streaming API the watch page
//! is built on.
//!
//! # Endpoints
//!
//! ```text
//! GET {base}/meta/anilist/info/{anime_id}?provider=gogoanime
//! GET {base}/meta/anilist/watch/{episode_id}?provider=gogoanime
//! ```
//!
//! Route handlers only see the [`AnimeApi`] trait, so tests can swap the
//! HTTP client for an in-memory implementation.

pub mod client;
pub mod types;

pub use client::{AnimeApi, ApiError, ConsumetClient};
pub use types::{
    AnimeInfo, AnimeTitle, Episode, IntroMarker, NextAiringEpisode, Recommendation, Relation,
    StreamSource, StreamingData, SubtitleTrack,
};
