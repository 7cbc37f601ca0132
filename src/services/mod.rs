pub mod cleanup;
pub mod consumet;
pub mod player;
pub mod request_cache;
pub mod sessions;
pub mod subtitles;
pub mod watch;
