//! Dispatcher - entry point for every inbound chat event.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::notetaker::chat::{ChatAdapter, ChatEvent};
use crate::notetaker::command::{Command, CommandRouter};
use crate::notetaker::error::NotetakerError;
use crate::notetaker::format;
use crate::notetaker::registry::SessionRegistry;
use crate::notetaker::session::{mint_id, Session};
use crate::notetaker::store::NoteStore;

/// Events older than this are assumed to be history replayed on (re)connect.
pub const REPLAY_WINDOW_SECS: i64 = 60;

const NEW_FAILED_REPLY: &str = "could not create session";
const CLOSED_EMPTY_REPLY: &str = "session closed, no notes were taken";

pub fn is_replay(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    timestamp < now - Duration::seconds(REPLAY_WINDOW_SECS)
}

pub struct Dispatcher {
    nick: String,
    chat: Arc<dyn ChatAdapter>,
    store: Arc<dyn NoteStore>,
    sessions: SessionRegistry,
    router: CommandRouter,
}

impl Dispatcher {
    pub fn new(nick: String, chat: Arc<dyn ChatAdapter>, store: Arc<dyn NoteStore>) -> Self {
        Self {
            nick,
            chat,
            store,
            sessions: SessionRegistry::new(),
            router: CommandRouter::new(),
        }
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Handle one inbound event to completion. Never fails: errors are replied or logged.
    pub async fn handle(&self, event: ChatEvent) {
        if is_replay(event.timestamp, Utc::now()) {
            debug!("Skipping replayed message to {} from {}", event.target, event.source);
            return;
        }

        if let Some(session) = self.sessions.get(&event.target).await {
            if let Err(e) = session.capture(&event.text).await {
                warn!("Failed to capture line in {}: {e}", event.target);
            }
            return;
        }

        if !event.target.eq_ignore_ascii_case(&self.nick) {
            return;
        }

        let result = match self.router.route(&event.text) {
            Ok(command) => {
                info!("📨 {} from {}", command.name(), event.source);
                self.execute(&event.source, command).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            self.report(&event.source, &e).await;
        }
    }

    async fn execute(&self, originator: &str, command: Command) -> Result<(), NotetakerError> {
        match command {
            Command::Help => self.help(originator).await,
            Command::New { password } => {
                let result = self.new_session(originator, password).await;
                if result.is_err() {
                    self.reply(originator, NEW_FAILED_REPLY).await;
                }
                result
            }
            Command::Save { id } => self.save(originator, &id).await,
            Command::Close { id } => self.close(originator, &id).await,
        }
    }

    async fn help(&self, originator: &str) -> Result<(), NotetakerError> {
        for line in format::help_lines() {
            self.chat.send(originator, &line).await?;
        }
        Ok(())
    }

    async fn new_session(
        &self,
        originator: &str,
        password: Option<String>,
    ) -> Result<(), NotetakerError> {
        let session = Session::new(mint_id(), originator.to_string(), password);
        if self.sessions.contains(session.channel()).await {
            return Err(NotetakerError::ChannelTaken(session.channel().to_string()));
        }

        session.open(self.chat.as_ref(), &self.nick).await?;

        let session = match self.sessions.register(session).await {
            Ok(session) => session,
            Err(session) => {
                self.chat.part(session.channel()).await?;
                return Err(NotetakerError::ChannelTaken(session.channel().to_string()));
            }
        };

        self.chat
            .send(
                originator,
                &format!(
                    "created channel {}, which you should be invited to join",
                    session.channel()
                ),
            )
            .await?;
        Ok(())
    }

    async fn save(&self, originator: &str, id: &str) -> Result<(), NotetakerError> {
        let session = self.sessions.authorize(originator, id).await?;

        match session.save(self.store.as_ref()).await {
            Ok(artifact) => {
                self.announce(originator, &session, &format::gist_location(&artifact.url))
                    .await
            }
            Err(e @ NotetakerError::Persistence(_)) => {
                self.announce(originator, &session, &e.to_string()).await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn close(&self, originator: &str, id: &str) -> Result<(), NotetakerError> {
        let session = self.sessions.authorize(originator, id).await?;

        match session.close(self.store.as_ref(), self.chat.as_ref()).await {
            Ok(artifact) => {
                self.sessions.remove(session.channel()).await;
                let reply = match artifact {
                    Some(artifact) => format::gist_location(&artifact.url),
                    None => CLOSED_EMPTY_REPLY.to_string(),
                };
                self.chat.send(originator, &reply).await?;
                Ok(())
            }
            Err(e @ NotetakerError::Persistence(_)) => {
                self.announce(originator, &session, &e.to_string()).await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Send to the requester and to the session channel.
    async fn announce(
        &self,
        originator: &str,
        session: &Session,
        text: &str,
    ) -> Result<(), NotetakerError> {
        self.chat.send(originator, text).await?;
        self.chat.send(session.channel(), text).await?;
        Ok(())
    }

    /// Best-effort reply to the originator.
    async fn reply(&self, originator: &str, text: &str) {
        if let Err(e) = self.chat.send(originator, text).await {
            warn!("Failed to reply to {originator}: {e}");
        }
    }

    /// Report a failed command. User-facing errors go to the originator; persistence
    /// errors have already been announced by the handler.
    async fn report(&self, originator: &str, e: &NotetakerError) {
        match e {
            NotetakerError::RoutingNoMatch
            | NotetakerError::SessionNotFound
            | NotetakerError::NotOwner
            | NotetakerError::NothingToSave => {
                info!("Command from {originator} rejected: {e}");
                self.reply(originator, &e.to_string()).await;
            }
            NotetakerError::Persistence(_) => warn!("Save for {originator} failed: {e}"),
            NotetakerError::Chat(_) | NotetakerError::ChannelTaken(_) => {
                error!("Command from {originator} failed: {e}")
            }
        }
    }
}
