//! In-memory adapters for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::notetaker::chat::{ChannelMode, ChatAdapter, ChatError};
use crate::notetaker::store::{Artifact, Document, NoteStore, StoreError};

/// Records every chat primitive as an IRC-like line.
#[derive(Default)]
pub struct RecordingChat {
    calls: Mutex<Vec<String>>,
    /// Calls starting with this prefix fail and are not recorded.
    fail_prefix: Option<&'static str>,
}

impl RecordingChat {
    /// A chat whose every call fails and records nothing.
    pub fn failing() -> Self {
        Self::failing_on("")
    }

    /// A chat that fails only calls of one kind, e.g. `"INVITE"` or `"PART"`.
    pub fn failing_on(prefix: &'static str) -> Self {
        Self { calls: Mutex::new(Vec::new()), fail_prefix: Some(prefix) }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Messages sent to `target`.
    pub fn sent_to(&self, target: &str) -> Vec<String> {
        let prefix = format!("PRIVMSG {target} ");
        self.calls()
            .iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) -> Result<(), ChatError> {
        if let Some(prefix) = self.fail_prefix
            && call.starts_with(prefix)
        {
            return Err(ChatError::Send(format!("refused: {call}")));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl ChatAdapter for RecordingChat {
    async fn join(&self, channel: &str) -> Result<(), ChatError> {
        self.record(format!("JOIN {channel}"))
    }

    async fn part(&self, channel: &str) -> Result<(), ChatError> {
        self.record(format!("PART {channel}"))
    }

    async fn set_modes(&self, channel: &str, modes: &[ChannelMode]) -> Result<(), ChatError> {
        let modes: Vec<String> = modes
            .iter()
            .map(|m| match m {
                ChannelMode::InviteOnly => "+i".to_string(),
                ChannelMode::Secret => "+s".to_string(),
                ChannelMode::Key(key) => format!("+k {key}"),
            })
            .collect();
        self.record(format!("MODE {channel} {}", modes.join(" ")))
    }

    async fn set_topic(&self, channel: &str, topic: &str) -> Result<(), ChatError> {
        self.record(format!("TOPIC {channel} {topic}"))
    }

    async fn invite(&self, channel: &str, nick: &str) -> Result<(), ChatError> {
        self.record(format!("INVITE {nick} {channel}"))
    }

    async fn send(&self, target: &str, text: &str) -> Result<(), ChatError> {
        self.record(format!("PRIVMSG {target} {text}"))
    }
}

/// Stores documents in memory, keyed by a sequential artifact id.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<(String, Document)>>,
    upserts: Mutex<usize>,
    failing: Mutex<bool>,
}

impl MemoryStore {
    pub fn documents(&self) -> Vec<Document> {
        self.documents.lock().unwrap().iter().map(|(_, d)| d.clone()).collect()
    }

    pub fn content(&self, id: &str) -> Option<String> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, d)| d.content.clone())
    }

    /// Number of documents created.
    pub fn created(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// Make subsequent upserts fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Number of upsert calls, successful or not.
    pub fn upserts(&self) -> usize {
        *self.upserts.lock().unwrap()
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn upsert(
        &self,
        existing: Option<&Artifact>,
        document: &Document,
    ) -> Result<Artifact, StoreError> {
        *self.upserts.lock().unwrap() += 1;
        if *self.failing.lock().unwrap() {
            return Err(StoreError::Api("502 Bad Gateway".to_string()));
        }
        let mut documents = self.documents.lock().unwrap();

        match existing {
            Some(artifact) => {
                let (_, doc) = documents
                    .iter_mut()
                    .find(|(id, _)| *id == artifact.id)
                    .ok_or_else(|| StoreError::Api(format!("404: no gist {}", artifact.id)))?;
                doc.content = document.content.clone();
                Ok(artifact.clone())
            }
            None => {
                let id = format!("gist{}", documents.len() + 1);
                documents.push((id.clone(), document.clone()));
                Ok(Artifact { url: format!("https://gist.example/{id}"), id })
            }
        }
    }
}

/// Every upsert fails.
pub struct FailingStore;

#[async_trait]
impl NoteStore for FailingStore {
    async fn upsert(&self, _: Option<&Artifact>, _: &Document) -> Result<Artifact, StoreError> {
        Err(StoreError::Http("connection refused".to_string()))
    }
}
