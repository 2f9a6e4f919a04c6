//! Channel name → session map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::notetaker::error::NotetakerError;
use crate::notetaker::session::{channel_name, Session};

/// Owns every live session. Keys are channel names, compared case-insensitively
/// the way IRC compares them.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

fn key(channel: &str) -> String {
    channel.to_ascii_lowercase()
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its channel. Gives the session back if the channel is taken.
    pub async fn register(&self, session: Session) -> Result<Arc<Session>, Session> {
        let mut sessions = self.sessions.lock().await;
        let key = key(session.channel());
        if sessions.contains_key(&key) {
            return Err(session);
        }
        let session = Arc::new(session);
        sessions.insert(key, session.clone());
        Ok(session)
    }

    pub async fn contains(&self, channel: &str) -> bool {
        self.sessions.lock().await.contains_key(&key(channel))
    }

    pub async fn get(&self, channel: &str) -> Option<Arc<Session>> {
        self.sessions.lock().await.get(&key(channel)).cloned()
    }

    pub async fn remove(&self, channel: &str) -> Option<Arc<Session>> {
        self.sessions.lock().await.remove(&key(channel))
    }

    /// Resolve a user-supplied session id and check that `originator` owns it.
    pub async fn authorize(
        &self,
        originator: &str,
        id: &str,
    ) -> Result<Arc<Session>, NotetakerError> {
        let session = self
            .get(&channel_name(id))
            .await
            .ok_or(NotetakerError::SessionNotFound)?;
        if !session.is_owner(originator) {
            return Err(NotetakerError::NotOwner);
        }
        Ok(session)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, owner: &str) -> Session {
        Session::new(id.to_string(), owner.to_string(), None)
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = SessionRegistry::new();
        registry.register(session("abc", "alice")).await.unwrap();

        assert!(registry.contains("#notetaker-abc").await);
        assert!(registry.contains("#NoteTaker-ABC").await);
        assert_eq!(registry.get("#notetaker-abc").await.unwrap().owner(), "alice");
        assert!(registry.get("#notetaker-other").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_channel_rejected() {
        let registry = SessionRegistry::new();
        registry.register(session("abc", "alice")).await.unwrap();

        let rejected = registry.register(session("abc", "bob")).await.unwrap_err();

        assert_eq!(rejected.owner(), "bob");
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.get("#notetaker-abc").await.unwrap().owner(), "alice");
    }

    #[tokio::test]
    async fn test_authorize() {
        let registry = SessionRegistry::new();
        registry.register(session("abc", "alice")).await.unwrap();

        assert!(registry.authorize("alice", "abc").await.is_ok());
        assert!(matches!(
            registry.authorize("bob", "abc").await,
            Err(NotetakerError::NotOwner)
        ));
        assert!(matches!(
            registry.authorize("alice", "nope").await,
            Err(NotetakerError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = SessionRegistry::new();
        registry.register(session("abc", "alice")).await.unwrap();

        assert!(registry.remove("#notetaker-abc").await.is_some());
        assert!(matches!(
            registry.authorize("alice", "abc").await,
            Err(NotetakerError::SessionNotFound)
        ));
    }
}
