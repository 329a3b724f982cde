//! Fast store for in-progress sessions, one per user.

use dashmap::DashMap;

use crate::{Result, TrainingSession};

/// Mutable per-user storage for the session currently being recorded.
///
/// Each operation is a whole-session read or write; concurrent writers for the same
/// user are not detected and the last write wins.
pub trait SessionCache: Send + Sync {
    /// Store `session` under its user id, replacing any previous entry
    fn save_session(&self, session: &TrainingSession) -> Result<()>;

    /// `Ok(None)` when the user has no session in progress
    fn get_session(&self, user_id: &str) -> Result<Option<TrainingSession>>;

    /// Removing a missing entry is not an error
    fn delete_session(&self, user_id: &str) -> Result<()>;
}

/// In-memory cache backed by a sharded concurrent map
#[derive(Default)]
pub struct MemorySessionCache {
    sessions: DashMap<String, TrainingSession>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for MemorySessionCache {
    fn save_session(&self, session: &TrainingSession) -> Result<()> {
        self.sessions
            .insert(session.user_id().to_string(), session.clone());
        Ok(())
    }

    fn get_session(&self, user_id: &str) -> Result<Option<TrainingSession>> {
        Ok(self.sessions.get(user_id).map(|entry| entry.value().clone()))
    }

    fn delete_session(&self, user_id: &str) -> Result<()> {
        self.sessions.remove(user_id);
        Ok(())
    }
}
