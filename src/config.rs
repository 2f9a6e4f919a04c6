use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notetaker::gist::GITHUB_API_URL;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// IRC server, e.g. "ircs://irc.libera.chat:6697".
    server: String,
    #[serde(default = "default_nick")]
    nick: String,
    /// SASL PLAIN account. Set both or neither.
    sasl_user: Option<String>,
    sasl_password: Option<String>,
    #[serde(default = "default_verify_tls")]
    verify_tls: bool,
    github_token: String,
    /// Base URL of the GitHub API (for GitHub Enterprise).
    github_api_url: Option<String>,
    #[serde(default = "default_persistence_timeout_secs")]
    persistence_timeout_secs: u64,
    /// Channel that receives the bot's own logs.
    log_channel: Option<String>,
    /// Directory for log files. Defaults to current directory.
    data_dir: Option<String>,
}

fn default_nick() -> String {
    "notetaker".to_string()
}

fn default_verify_tls() -> bool {
    true
}

fn default_persistence_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslCredentials {
    pub user: String,
    pub password: String,
}

pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// True for `ircs://` servers.
    pub use_tls: bool,
    pub verify_tls: bool,
    pub nick: String,
    pub sasl: Option<SaslCredentials>,
    pub github_token: String,
    pub github_api_url: String,
    /// Upper bound on a single gist call.
    pub persistence_timeout: Duration,
    pub log_channel: Option<String>,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let (server_host, server_port, use_tls) = parse_server(&file.server)?;

        if file.nick.is_empty() || file.nick.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!("nick '{}' is invalid", file.nick)));
        }
        if file.github_token.is_empty() {
            return Err(ConfigError::Validation("github_token is required".into()));
        }
        if file.persistence_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "persistence_timeout_secs must be greater than zero".into(),
            ));
        }

        let sasl = match (file.sasl_user, file.sasl_password) {
            (Some(user), Some(password)) => Some(SaslCredentials { user, password }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Validation(
                    "sasl_user and sasl_password must be set together".into(),
                ));
            }
        };

        if let Some(ref channel) = file.log_channel
            && !channel.starts_with('#')
        {
            return Err(ConfigError::Validation(format!(
                "log_channel '{channel}' must start with '#'"
            )));
        }

        let github_api_url = file.github_api_url.unwrap_or_else(|| GITHUB_API_URL.to_string());
        Url::parse(&github_api_url).map_err(|e| {
            ConfigError::Validation(format!("github_api_url '{github_api_url}' is invalid: {e}"))
        })?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            server_host,
            server_port,
            use_tls,
            verify_tls: file.verify_tls,
            nick: file.nick,
            sasl,
            github_token: file.github_token,
            github_api_url,
            persistence_timeout: Duration::from_secs(file.persistence_timeout_secs),
            log_channel: file.log_channel,
            data_dir,
        })
    }
}

/// Split `irc://host:port` / `ircs://host:port` into host, port and TLS flag.
fn parse_server(server: &str) -> Result<(String, u16, bool), ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::Validation(format!(
            "server '{server}' {reason} (expected format: ircs://irc.example.org:6697)"
        ))
    };

    let url = Url::parse(server).map_err(|_| invalid("is not a URL"))?;
    let use_tls = match url.scheme() {
        "ircs" => true,
        "irc" => false,
        _ => return Err(invalid("must use the irc or ircs scheme")),
    };
    let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| invalid("has no host"))?;
    let port = url.port().ok_or_else(|| invalid("has no port"))?;

    Ok((host.to_string(), port, use_tls))
}
