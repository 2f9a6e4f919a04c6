//! Notetaker - ephemeral note-taking channels persisted to gists.

pub mod chat;
pub mod command;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod gist;
pub mod registry;
pub mod session;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use chat::{ChatAdapter, ChatError};
pub use connection::IrcConnection;
pub use dispatch::Dispatcher;
pub use gist::GistClient;
