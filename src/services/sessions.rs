use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::services::watch::WatchController;

/// Shared handle to one viewer's controller
pub type SessionHandle = Arc<Mutex<WatchController>>;

struct SessionEntry {
    controller: SessionHandle,
    /// Unix millis; pushed forward on every access
    expires_at: i64,
}

/// In-memory store of interactive watch sessions with sliding expiry
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    ttl_ms: i64,
}

impl SessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl_ms: ttl_seconds.saturating_mul(1000).min(i64::MAX as u64) as i64,
        }
    }

    fn deadline(&self) -> i64 {
        chrono::Utc::now()
            .timestamp_millis()
            .saturating_add(self.ttl_ms)
    }

    /// Register a controller and return its session id
    pub async fn create(&self, controller: WatchController) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(controller));
        let entry = SessionEntry {
            controller: Arc::clone(&handle),
            expires_at: self.deadline(),
        };
        self.sessions.write().await.insert(id, entry);
        (id, handle)
    }

    /// Look up a live session, extending its lifetime
    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut sessions = self.sessions.write().await;

        let live = sessions.get(id).map(|entry| entry.expires_at > now)?;
        if !live {
            sessions.remove(id);
            return None;
        }

        let entry = sessions.get_mut(id)?;
        entry.expires_at = now.saturating_add(self.ttl_ms);
        Some(Arc::clone(&entry.controller))
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Drop expired sessions, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
