//! Chat network boundary: the primitives the bot needs from an IRC-like network.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// An inbound message as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Channel name or the bot's own nick for direct messages.
    pub target: String,
    /// Nick of the sender.
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Channel modes the bot sets on session channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMode {
    InviteOnly,
    Secret,
    /// Join key.
    Key(String),
}

#[derive(Debug)]
pub enum ChatError {
    /// The connection could not be established or registration failed.
    Connect(String),
    /// A command could not be queued or sent.
    Send(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "chat connection error: {e}"),
            Self::Send(e) => write!(f, "chat send error: {e}"),
        }
    }
}

impl std::error::Error for ChatError {}

/// Channel lifecycle and messaging primitives.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    async fn join(&self, channel: &str) -> Result<(), ChatError>;

    async fn part(&self, channel: &str) -> Result<(), ChatError>;

    async fn set_modes(&self, channel: &str, modes: &[ChannelMode]) -> Result<(), ChatError>;

    async fn set_topic(&self, channel: &str, topic: &str) -> Result<(), ChatError>;

    async fn invite(&self, channel: &str, nick: &str) -> Result<(), ChatError>;

    /// Send a message to a channel or nick. Multi-line text is sent line by line.
    async fn send(&self, target: &str, text: &str) -> Result<(), ChatError>;
}
