use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::notetaker::ChatAdapter;

/// Flush buffered INFO lines once this many are waiting.
const MAX_BUFFERED: usize = 50;

/// Log message with priority.
#[derive(Debug, PartialEq, Eq)]
enum LogMessage {
    /// High priority (WARN/ERROR) - send immediately
    Urgent(String),
    /// Low priority (INFO) - batch and send periodically
    Info(String),
}

/// Forwards INFO and above to an IRC channel.
///
/// The layer is installed before the connection exists; events are queued until
/// [`LogForwarder::spawn`] is given a chat to send them through.
pub struct IrcLogLayer {
    tx: mpsc::UnboundedSender<LogMessage>,
}

pub struct LogForwarder {
    rx: mpsc::UnboundedReceiver<LogMessage>,
}

impl IrcLogLayer {
    pub fn new() -> (Self, LogForwarder) {
        let (tx, rx) = mpsc::unbounded_channel::<LogMessage>();
        (Self { tx }, LogForwarder { rx })
    }
}

impl LogForwarder {
    pub fn spawn(mut self, chat: Arc<dyn ChatAdapter>, channel: String) {
        tokio::spawn(async move {
            let mut info_buffer: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(Duration::from_secs(5));

            loop {
                tokio::select! {
                    msg = self.rx.recv() => {
                        match msg {
                            Some(LogMessage::Urgent(text)) => {
                                send_log(chat.as_ref(), &channel, &text).await;
                            }
                            Some(LogMessage::Info(text)) => {
                                info_buffer.push(text);
                                if info_buffer.len() >= MAX_BUFFERED {
                                    flush_buffer(chat.as_ref(), &channel, &mut info_buffer).await;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = interval.tick() => {
                        if !info_buffer.is_empty() {
                            flush_buffer(chat.as_ref(), &channel, &mut info_buffer).await;
                        }
                    }
                }
            }
        });
    }
}

async fn send_log(chat: &dyn ChatAdapter, channel: &str, text: &str) {
    // Errors go to stderr: logging them would feed back into this layer.
    if let Err(e) = chat.send(channel, text).await {
        eprintln!("Failed to send log to {channel}: {e}");
    }
}

async fn flush_buffer(chat: &dyn ChatAdapter, channel: &str, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let combined = buffer.join("\n");
    buffer.clear();
    send_log(chat, channel, &combined).await;
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

fn classify(level: Level, message: String) -> Option<LogMessage> {
    match level {
        Level::ERROR => Some(LogMessage::Urgent(format!("❌ {message}"))),
        Level::WARN => Some(LogMessage::Urgent(format!("⚠️ {message}"))),
        Level::INFO => Some(LogMessage::Info(message)),
        _ => None,
    }
}

impl<S: Subscriber> Layer<S> for IrcLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // Logs from the IRC client itself would echo our own sends back.
        if event.metadata().target().starts_with("irc") {
            return;
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        let Some(msg) = classify(*event.metadata().level(), visitor.message) else {
            return;
        };

        if self.tx.send(msg).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notetaker::session::Session;
    use crate::notetaker::testing::{MemoryStore, RecordingChat};
    use tracing::instrument::WithSubscriber;
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_classify_levels() {
        assert_eq!(
            classify(Level::ERROR, "boom".into()),
            Some(LogMessage::Urgent("❌ boom".into()))
        );
        assert!(matches!(classify(Level::WARN, "w".into()), Some(LogMessage::Urgent(_))));
        assert_eq!(classify(Level::INFO, "i".into()), Some(LogMessage::Info("i".into())));
        assert_eq!(classify(Level::DEBUG, "d".into()), None);
    }

    #[tokio::test]
    async fn test_urgent_sent_immediately() {
        let chat = Arc::new(RecordingChat::default());
        let (layer, forwarder) = IrcLogLayer::new();
        forwarder.spawn(chat.clone(), "#logs".to_string());

        layer.tx.send(LogMessage::Urgent("❌ failed".into())).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(chat.sent_to("#logs"), vec!["❌ failed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_info_batched() {
        let chat = Arc::new(RecordingChat::default());
        let (layer, forwarder) = IrcLogLayer::new();
        forwarder.spawn(chat.clone(), "#logs".to_string());
        // Let the first (immediate) interval tick pass.
        tokio::time::sleep(Duration::from_millis(10)).await;

        layer.tx.send(LogMessage::Info("one".into())).unwrap();
        layer.tx.send(LogMessage::Info("two".into())).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(chat.sent_to("#logs").is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(chat.sent_to("#logs"), vec!["one\ntwo"]);
    }

    #[tokio::test]
    async fn test_saved_gist_link_is_not_forwarded() {
        let (layer, mut forwarder) = IrcLogLayer::new();
        let subscriber = tracing_subscriber::registry().with(layer);
        let store = MemoryStore::default();
        let chat = RecordingChat::default();
        let session = Session::new("abc".to_string(), "alice".to_string(), None);
        session.capture("private").await.unwrap();

        let artifact = async {
            session.save(&store).await.unwrap();
            session.close(&store, &chat).await.unwrap().unwrap()
        }
        .with_subscriber(subscriber)
        .await;

        let mut forwarded = Vec::new();
        while let Ok(msg) = forwarder.rx.try_recv() {
            forwarded.push(format!("{msg:?}"));
        }
        assert!(forwarded.iter().any(|m| m.contains("Saved notes for #notetaker-abc")));
        assert!(forwarded.iter().all(|m| !m.contains(&artifact.url) && !m.contains(&artifact.id)));
    }
}
