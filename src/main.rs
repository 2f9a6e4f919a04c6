mod config;
mod irc_log;
mod notetaker;

use std::sync::Arc;

use futures::StreamExt;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use config::Config;
use irc_log::{IrcLogLayer, LogForwarder};
use notetaker::{ChatAdapter, ChatError, Dispatcher, GistClient, IrcConnection};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "notetaker.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("notetaker.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    let log_forwarder = if config.log_channel.is_some() {
        let (layer, forwarder) = IrcLogLayer::new();
        registry.with(layer).init();
        Some(forwarder)
    } else {
        registry.init();
        None
    };

    info!("🚀 Starting notetaker...");
    info!("Loaded config from {config_path}");

    if let Err(e) = run(config, log_forwarder).await {
        error!("Fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(
    config: Config,
    log_forwarder: Option<LogForwarder>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = GistClient::new(
        config.github_token.clone(),
        config.github_api_url.clone(),
        config.persistence_timeout,
    )?;

    let mut connection = IrcConnection::connect(&config).await?;
    let chat: Arc<dyn ChatAdapter> = Arc::new(connection.chat());

    if let (Some(forwarder), Some(channel)) = (log_forwarder, config.log_channel.clone()) {
        forwarder.spawn(chat.clone(), channel);
    }

    let dispatcher = Dispatcher::new(config.nick.clone(), chat, Arc::new(store));

    connection.register()?;
    let mut stream = connection.stream()?;

    // Events are handled one at a time so captured lines keep their arrival order.
    while let Some(message) = stream.next().await {
        let message = message?;
        match connection.process(&message) {
            Ok(Some(event)) => dispatcher.handle(event).await,
            Ok(None) => {}
            Err(e @ ChatError::Connect(_)) => return Err(e.into()),
            Err(e) => warn!("Failed to handle IRC message: {e}"),
        }
    }

    info!("Connection closed");
    Ok(())
}
