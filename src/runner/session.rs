use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use super::engine::Message;

/// Conversation persistence keyed by session id: create-or-resume
/// semantics. A database-backed store can slot in behind this trait.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the prior transcript for the session, empty for a new one.
    async fn resume(&self, session_id: &str) -> Result<Vec<Message>>;

    async fn append(&self, session_id: &str, messages: &[Message]) -> Result<()>;
}

pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn resume(&self, session_id: &str) -> Result<Vec<Message>> {
        let sessions = self.sessions.read().unwrap();
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn append(&self, session_id: &str, messages: &[Message]) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        sessions
            .entry(session_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }
}
