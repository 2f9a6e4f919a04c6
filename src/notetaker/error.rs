use std::fmt;

use crate::notetaker::chat::ChatError;
use crate::notetaker::store::StoreError;

/// Errors surfaced by command handling. `Display` is the text replied to users.
#[derive(Debug)]
pub enum NotetakerError {
    /// No command rule matched a message sent to the bot.
    RoutingNoMatch,
    /// The session id does not resolve to a live session.
    SessionNotFound,
    /// The requester did not create the session.
    NotOwner,
    /// SAVE on a session with an empty transcript.
    NothingToSave,
    /// The storage upsert failed or timed out.
    Persistence(StoreError),
    /// A chat primitive failed.
    Chat(ChatError),
    /// A freshly minted session channel is already registered.
    ChannelTaken(String),
}

impl fmt::Display for NotetakerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoutingNoMatch => write!(f, "Unknown command. Run HELP to get help"),
            Self::SessionNotFound => write!(f, "could not find session"),
            Self::NotOwner => write!(f, "you were not the requestor of this session"),
            Self::NothingToSave => write!(f, "no notes to save yet"),
            Self::Persistence(e) => write!(f, "could not save notes: {e}"),
            Self::Chat(e) => write!(f, "{e}"),
            Self::ChannelTaken(channel) => write!(f, "channel {channel} is already in use"),
        }
    }
}

impl std::error::Error for NotetakerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Persistence(e) => Some(e),
            Self::Chat(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChatError> for NotetakerError {
    fn from(e: ChatError) -> Self {
        Self::Chat(e)
    }
}

impl From<StoreError> for NotetakerError {
    fn from(e: StoreError) -> Self {
        Self::Persistence(e)
    }
}
