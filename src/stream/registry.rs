use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Information about a connected client session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub connected_at: DateTime<Utc>,
    pub streaming: bool,
}

/// In-memory registry of active sessions
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionInfo>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a newly accepted connection
    pub fn register(&self) -> Uuid {
        let session_id = Uuid::new_v4();
        let info = SessionInfo {
            session_id,
            connected_at: Utc::now(),
            streaming: false,
        };
        self.sessions.write().insert(session_id, info);
        session_id
    }

    /// Flag whether the session's production task is running
    pub fn set_streaming(&self, session_id: &Uuid, streaming: bool) {
        if let Some(info) = self.sessions.write().get_mut(session_id) {
            info.streaming = streaming;
        }
    }

    /// Remove a session on disconnect
    pub fn disconnect(&self, session_id: &Uuid) {
        self.sessions.write().remove(session_id);
    }

    pub fn is_streaming(&self, session_id: &Uuid) -> bool {
        self.sessions
            .read()
            .get(session_id)
            .map(|info| info.streaming)
            .unwrap_or(false)
    }

    /// Number of connected sessions
    pub fn active_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Number of sessions with a running production task
    pub fn streaming_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|info| info.streaming)
            .count()
    }

    /// Get all active sessions
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        self.sessions.read().values().cloned().collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_disconnect() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.active_count(), 0);

        let id = registry.register();
        assert_eq!(registry.active_count(), 1);
        assert!(!registry.is_streaming(&id));

        registry.disconnect(&id);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn streaming_flag_bookkeeping() {
        let registry = SessionRegistry::new();
        let a = registry.register();
        let b = registry.register();

        registry.set_streaming(&a, true);
        assert!(registry.is_streaming(&a));
        assert!(!registry.is_streaming(&b));
        assert_eq!(registry.streaming_count(), 1);

        registry.set_streaming(&a, false);
        assert_eq!(registry.streaming_count(), 0);
    }

    #[test]
    fn set_streaming_on_unknown_session_is_a_no_op() {
        let registry = SessionRegistry::new();
        registry.set_streaming(&Uuid::new_v4(), true);
        assert_eq!(registry.streaming_count(), 0);
    }
}
