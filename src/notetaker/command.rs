//! Command grammar for messages sent directly to the bot.
//!
//! A command is a keyword followed by an optional argument, separated by whitespace.
//! Keywords are case-insensitive. Rules are tried in a fixed priority order and the first
//! rule whose keyword and argument shape both match wins.

use crate::notetaker::error::NotetakerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    New { password: Option<String> },
    Save { id: String },
    Close { id: String },
}

impl Command {
    /// Keyword of the command, for logs. Never includes the argument.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "HELP",
            Self::New { .. } => "NEW",
            Self::Save { .. } => "SAVE",
            Self::Close { .. } => "CLOSE",
        }
    }
}

/// Argument shape a rule accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Argument {
    None,
    /// Absent, or a single whitespace-free word.
    OptionalWord,
    Required,
}

struct Rule {
    keyword: &'static str,
    argument: Argument,
    build: fn(Option<&str>) -> Command,
}

impl Rule {
    fn accepts(&self, keyword: &str, argument: Option<&str>) -> bool {
        if !self.keyword.eq_ignore_ascii_case(keyword) {
            return false;
        }
        match self.argument {
            Argument::None => argument.is_none(),
            Argument::OptionalWord => argument.is_none_or(|a| !a.contains(char::is_whitespace)),
            Argument::Required => argument.is_some(),
        }
    }
}

/// Priority-ordered command rules.
pub struct CommandRouter {
    rules: Vec<Rule>,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRouter {
    pub fn new() -> Self {
        let rules = vec![
            Rule {
                keyword: "new",
                argument: Argument::OptionalWord,
                build: |arg| Command::New { password: arg.map(str::to_string) },
            },
            Rule {
                keyword: "help",
                argument: Argument::None,
                build: |_| Command::Help,
            },
            Rule {
                keyword: "save",
                argument: Argument::Required,
                build: |arg| Command::Save { id: arg.unwrap_or_default().to_string() },
            },
            Rule {
                keyword: "close",
                argument: Argument::Required,
                build: |arg| Command::Close { id: arg.unwrap_or_default().to_string() },
            },
        ];
        Self { rules }
    }

    /// Parse `text` into a command.
    pub fn route(&self, text: &str) -> Result<Command, NotetakerError> {
        let (keyword, argument) = split_command(text);
        self.rules
            .iter()
            .find(|rule| rule.accepts(keyword, argument))
            .map(|rule| (rule.build)(argument))
            .ok_or(NotetakerError::RoutingNoMatch)
    }
}

/// Split trimmed text into keyword and the trimmed remainder (`None` when empty).
fn split_command(text: &str) -> (&str, Option<&str>) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((keyword, rest)) => {
            let rest = rest.trim();
            (keyword, if rest.is_empty() { None } else { Some(rest) })
        }
        None => (text, None),
    }
}
