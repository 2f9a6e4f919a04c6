//! Notetaking sessions: one access-restricted channel and its transcript.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::notetaker::chat::{ChannelMode, ChatAdapter};
use crate::notetaker::error::NotetakerError;
use crate::notetaker::format;
use crate::notetaker::store::{Artifact, Document, NoteStore, NOTES_FILENAME};

const CHANNEL_PREFIX: &str = "#notetaker-";

/// Mint a new session id.
pub fn mint_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Channel name for a session id. The only mapping from a user-supplied id to a channel.
pub fn channel_name(id: &str) -> String {
    format!("{CHANNEL_PREFIX}{id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

#[derive(Debug)]
struct Transcript {
    lines: Vec<String>,
    state: SessionState,
}

/// A live notetaking session.
///
/// Lock order is always `artifact` then `transcript`.
#[derive(Debug)]
pub struct Session {
    id: String,
    channel: String,
    owner: String,
    password: Option<String>,
    transcript: Mutex<Transcript>,
    /// Held across the storage call so saves and closes of one session never interleave.
    artifact: Mutex<Option<Artifact>>,
}

impl Session {
    pub fn new(id: String, owner: String, password: Option<String>) -> Self {
        Self {
            channel: channel_name(&id),
            id,
            owner,
            password,
            transcript: Mutex::new(Transcript { lines: Vec::new(), state: SessionState::Open }),
            artifact: Mutex::new(None),
        }
    }

    /// Set up the session channel: join, restrict, optionally lock, set the topic,
    /// post the welcome text and invite the owner. Leaves the channel again if any step
    /// after the join fails.
    pub async fn open(&self, chat: &dyn ChatAdapter, nick: &str) -> Result<(), NotetakerError> {
        chat.join(&self.channel).await?;
        if let Err(e) = self.configure(chat, nick).await {
            if let Err(part_err) = chat.part(&self.channel).await {
                warn!("Failed to leave {} after setup failed: {part_err}", self.channel);
            }
            return Err(e);
        }

        info!("Opened session {} for {}", self.channel, self.owner);
        Ok(())
    }

    async fn configure(&self, chat: &dyn ChatAdapter, nick: &str) -> Result<(), NotetakerError> {
        chat.set_modes(&self.channel, &[ChannelMode::InviteOnly, ChannelMode::Secret])
            .await?;
        if let Some(ref password) = self.password {
            chat.set_modes(&self.channel, &[ChannelMode::Key(password.clone())]).await?;
        }
        chat.set_topic(&self.channel, &format::session_topic(nick, &self.id)).await?;
        for line in format::welcome_lines(nick, &self.id) {
            chat.send(&self.channel, &line).await?;
        }
        chat.invite(&self.channel, &self.owner).await?;
        Ok(())
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[cfg(test)]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_owner(&self, nick: &str) -> bool {
        self.owner == nick
    }

    #[cfg(test)]
    pub async fn state(&self) -> SessionState {
        self.transcript.lock().await.state
    }

    #[cfg(test)]
    pub async fn lines(&self) -> Vec<String> {
        self.transcript.lock().await.lines.clone()
    }

    #[cfg(test)]
    pub async fn artifact(&self) -> Option<Artifact> {
        self.artifact.lock().await.clone()
    }

    /// Append a line to the transcript.
    pub async fn capture(&self, line: &str) -> Result<(), NotetakerError> {
        let mut transcript = self.transcript.lock().await;
        if transcript.state == SessionState::Closed {
            warn!("Dropping line for closed session {}", self.channel);
            return Err(NotetakerError::SessionNotFound);
        }
        transcript.lines.push(line.to_string());
        debug!("Captured line {} in {}", transcript.lines.len(), self.channel);
        Ok(())
    }

    /// Persist the transcript, creating the artifact on first save and updating it after.
    pub async fn save(&self, store: &dyn NoteStore) -> Result<Artifact, NotetakerError> {
        let mut artifact = self.artifact.lock().await;
        let content = {
            let transcript = self.transcript.lock().await;
            if transcript.state == SessionState::Closed {
                return Err(NotetakerError::SessionNotFound);
            }
            transcript.lines.join("\n")
        };
        if content.is_empty() {
            return Err(NotetakerError::NothingToSave);
        }
        self.persist(store, &mut artifact, content).await
    }

    /// Save, post the artifact link in the channel, then leave it. The session is closed
    /// only if every step succeeds. An empty transcript is not persisted and yields `None`.
    pub async fn close(
        &self,
        store: &dyn NoteStore,
        chat: &dyn ChatAdapter,
    ) -> Result<Option<Artifact>, NotetakerError> {
        let mut artifact = self.artifact.lock().await;
        let mut transcript = self.transcript.lock().await;
        if transcript.state == SessionState::Closed {
            return Err(NotetakerError::SessionNotFound);
        }

        let content = transcript.lines.join("\n");
        let saved = if content.is_empty() {
            debug!("Nothing to save for {}", self.channel);
            None
        } else {
            let saved = self.persist(store, &mut artifact, content).await?;
            chat.send(&self.channel, &format::gist_location(&saved.url)).await?;
            Some(saved)
        };

        chat.part(&self.channel).await?;
        transcript.state = SessionState::Closed;

        info!("Closed session {} ({} lines)", self.channel, transcript.lines.len());
        Ok(saved)
    }

    async fn persist(
        &self,
        store: &dyn NoteStore,
        slot: &mut Option<Artifact>,
        content: String,
    ) -> Result<Artifact, NotetakerError> {
        let document = Document {
            name: NOTES_FILENAME.to_string(),
            description: format!("Uploaded by notetaker for {}", self.owner),
            content,
            public: false,
        };

        let saved = store.upsert(slot.as_ref(), &document).await?;
        // The link grants read access, so it stays out of INFO (and the log channel).
        info!("Saved notes for {}", self.channel);
        debug!("Notes for {} at {}", self.channel, saved.url);
        *slot = Some(saved.clone());
        Ok(saved)
    }
}
