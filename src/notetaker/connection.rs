//! IRC connection and chat adapter built on the `irc` crate.
//!
//! Registration requests the `server-time` capability (so replayed history can be told
//! apart from live traffic) and, when credentials are configured, authenticates with
//! SASL PLAIN before ending capability negotiation.

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use irc::client::prelude::{
    ChannelMode as IrcChannelMode, Client, Command, Config as IrcConfig, Message, Mode, Response,
    Sender,
};
use irc::client::ClientStream;
use irc::proto::CapSubCommand;
use tracing::{info, warn};

use crate::config::{Config, SaslCredentials};
use crate::notetaker::chat::{ChannelMode, ChatAdapter, ChatError, ChatEvent};

/// Longest text sent in one PRIVMSG, leaving room for the prefix and target.
const MAX_LINE_BYTES: usize = 400;

/// Sends chat primitives over an IRC connection.
#[derive(Clone)]
pub struct IrcChat {
    sender: Sender,
}

impl IrcChat {
    fn send_command(&self, command: Command) -> Result<(), ChatError> {
        self.sender.send(command).map_err(|e| ChatError::Send(e.to_string()))
    }
}

#[async_trait]
impl ChatAdapter for IrcChat {
    async fn join(&self, channel: &str) -> Result<(), ChatError> {
        self.send_command(Command::JOIN(channel.to_string(), None, None))
    }

    async fn part(&self, channel: &str) -> Result<(), ChatError> {
        self.send_command(Command::PART(channel.to_string(), None))
    }

    async fn set_modes(&self, channel: &str, modes: &[ChannelMode]) -> Result<(), ChatError> {
        let modes = modes
            .iter()
            .map(|mode| match mode {
                ChannelMode::InviteOnly => Mode::Plus(IrcChannelMode::InviteOnly, None),
                ChannelMode::Secret => Mode::Plus(IrcChannelMode::Secret, None),
                ChannelMode::Key(key) => Mode::Plus(IrcChannelMode::Key, Some(key.clone())),
            })
            .collect();
        self.send_command(Command::ChannelMODE(channel.to_string(), modes))
    }

    async fn set_topic(&self, channel: &str, topic: &str) -> Result<(), ChatError> {
        self.send_command(Command::TOPIC(channel.to_string(), Some(topic.to_string())))
    }

    async fn invite(&self, channel: &str, nick: &str) -> Result<(), ChatError> {
        self.send_command(Command::INVITE(nick.to_string(), channel.to_string()))
    }

    async fn send(&self, target: &str, text: &str) -> Result<(), ChatError> {
        for line in outgoing_lines(text) {
            self.send_command(Command::PRIVMSG(target.to_string(), line))?;
        }
        Ok(())
    }
}

/// Split text into IRC-sendable lines. Empty lines become a single space so layout survives.
fn outgoing_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                return " ".to_string();
            }
            let mut end = line.len().min(MAX_LINE_BYTES);
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            line[..end].to_string()
        })
        .collect()
}

/// What to do with one inbound IRC message.
#[derive(Debug, Default)]
pub struct Inbound {
    /// Commands to send back during registration.
    pub replies: Vec<Command>,
    /// A PRIVMSG to hand to the dispatcher.
    pub event: Option<ChatEvent>,
}

/// Registration state shared by the connection and its inbound handling.
pub struct Registration {
    nick: String,
    sasl: Option<SaslCredentials>,
    log_channel: Option<String>,
}

impl Registration {
    pub fn new(nick: String, sasl: Option<SaslCredentials>, log_channel: Option<String>) -> Self {
        Self { nick, sasl, log_channel }
    }

    /// Commands opening the connection.
    pub fn start(&self) -> Vec<Command> {
        let caps = if self.sasl.is_some() { "sasl server-time" } else { "server-time" };
        vec![
            Command::CAP(None, CapSubCommand::REQ, None, Some(caps.to_string())),
            Command::NICK(self.nick.clone()),
            Command::USER(self.nick.clone(), "0".to_string(), self.nick.clone()),
        ]
    }

    /// Handle one inbound message.
    pub fn process(&self, message: &Message) -> Result<Inbound, ChatError> {
        let mut inbound = Inbound::default();

        match &message.command {
            Command::CAP(_, CapSubCommand::ACK, first, second) => {
                let acked = [first, second]
                    .iter()
                    .filter_map(|c| c.as_deref())
                    .any(|caps| caps.split_whitespace().any(|c| c == "sasl"));
                if acked && self.sasl.is_some() {
                    inbound.replies.push(Command::AUTHENTICATE("PLAIN".to_string()));
                } else {
                    inbound.replies.push(end_negotiation());
                }
            }
            Command::CAP(_, CapSubCommand::NAK, _, _) => {
                if self.sasl.is_some() {
                    warn!("Server refused SASL, continuing unauthenticated");
                }
                inbound.replies.push(end_negotiation());
            }
            Command::AUTHENTICATE(challenge) if challenge == "+" => {
                if let Some(ref sasl) = self.sasl {
                    inbound.replies.push(Command::AUTHENTICATE(sasl_plain_payload(sasl)));
                }
            }
            Command::Response(Response::RPL_SASLSUCCESS, _) => {
                info!("SASL authentication succeeded");
                inbound.replies.push(end_negotiation());
            }
            Command::Response(
                response @ (Response::ERR_SASLFAIL
                | Response::ERR_SASLTOOLONG
                | Response::ERR_SASLABORT),
                args,
            ) => {
                return Err(ChatError::Connect(format!(
                    "SASL authentication failed ({response:?}): {}",
                    args.join(" ")
                )));
            }
            Command::Response(Response::RPL_WELCOME, _) => {
                info!("🔌 Connected as {}", self.nick);
                if let Some(ref channel) = self.log_channel {
                    inbound.replies.push(Command::JOIN(channel.clone(), None, None));
                }
            }
            Command::PRIVMSG(target, text) => {
                let source = message.source_nickname().unwrap_or_default().to_string();
                inbound.event = Some(ChatEvent {
                    target: target.clone(),
                    source,
                    timestamp: server_time(message).unwrap_or_else(Utc::now),
                    text: text.clone(),
                });
            }
            _ => {}
        }

        Ok(inbound)
    }
}

fn end_negotiation() -> Command {
    Command::CAP(None, CapSubCommand::END, None, None)
}

/// `AUTHENTICATE` payload for SASL PLAIN: base64 of `authzid\0authcid\0password`.
pub fn sasl_plain_payload(sasl: &SaslCredentials) -> String {
    let raw = format!("{}\0{}\0{}", sasl.user, sasl.user, sasl.password);
    base64::engine::general_purpose::STANDARD.encode(raw)
}

/// Timestamp from the `server-time` tag, if present and valid.
pub fn server_time(message: &Message) -> Option<DateTime<Utc>> {
    message
        .tags
        .as_ref()?
        .iter()
        .find(|tag| tag.0 == "time")
        .and_then(|tag| tag.1.as_deref())
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// An open IRC connection.
pub struct IrcConnection {
    client: Client,
    registration: Registration,
}

impl IrcConnection {
    pub async fn connect(config: &Config) -> Result<Self, ChatError> {
        let irc_config = IrcConfig {
            nickname: Some(config.nick.clone()),
            username: Some(config.nick.clone()),
            realname: Some(config.nick.clone()),
            server: Some(config.server_host.clone()),
            port: Some(config.server_port),
            use_tls: Some(config.use_tls),
            dangerously_accept_invalid_certs: Some(!config.verify_tls),
            ..IrcConfig::default()
        };

        info!(
            "Connecting to {}:{} (tls: {})",
            config.server_host, config.server_port, config.use_tls
        );
        let client = Client::from_config(irc_config)
            .await
            .map_err(|e| ChatError::Connect(e.to_string()))?;

        Ok(Self {
            client,
            registration: Registration::new(
                config.nick.clone(),
                config.sasl.clone(),
                config.log_channel.clone(),
            ),
        })
    }

    pub fn chat(&self) -> IrcChat {
        IrcChat { sender: self.client.sender() }
    }

    /// Send the opening CAP/NICK/USER commands.
    pub fn register(&self) -> Result<(), ChatError> {
        self.send_all(self.registration.start())
    }

    pub fn stream(&mut self) -> Result<ClientStream, ChatError> {
        self.client.stream().map_err(|e| ChatError::Connect(e.to_string()))
    }

    /// Handle registration traffic and extract a chat event, if any.
    pub fn process(&self, message: &Message) -> Result<Option<ChatEvent>, ChatError> {
        let inbound = self.registration.process(message)?;
        self.send_all(inbound.replies)?;
        Ok(inbound.event)
    }

    fn send_all(&self, commands: Vec<Command>) -> Result<(), ChatError> {
        for command in commands {
            self.client.send(command).map_err(|e| ChatError::Send(e.to_string()))?;
        }
        Ok(())
    }
}
