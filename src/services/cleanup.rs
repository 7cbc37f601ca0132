//! Periodic cleanup of expired sessions and cache entries
//!
//! Runs as a background task on startup, then every `interval_secs`.

use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::AppState;

/// Configuration for the cleanup task
pub struct CleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

/// Counts from one cleanup pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub sessions: usize,
    pub info_entries: usize,
    pub streaming_entries: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.sessions + self.info_entries + self.streaming_entries
    }
}

/// Run all cleanup steps once
pub async fn run_cleanup(state: &AppState) -> CleanupReport {
    CleanupReport {
        sessions: state.sessions.purge_expired().await,
        info_entries: state.info_cache.purge_expired(),
        streaming_entries: state.streaming_cache.purge_expired(),
    }
}

/// Start the cleanup background task
pub async fn start_cleanup_task(state: Arc<AppState>, config: CleanupConfig) {
    let mut interval = time::interval(Duration::from_secs(config.interval_secs.max(1)));

    loop {
        interval.tick().await;

        let report = run_cleanup(&state).await;
        if report.total() > 0 {
            tracing::info!(
                sessions = report.sessions,
                info_entries = report.info_entries,
                streaming_entries = report.streaming_entries,
                "Cleanup removed expired entries"
            );
        } else {
            tracing::debug!("Cleanup: nothing expired");
        }
    }
}
