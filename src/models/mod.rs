pub mod watch;

pub use watch::{
    PlaybackMode, PlayerArea, PlayerSource, PlayerSubtitle, PlayerView, SessionView, StreamKey,
};
