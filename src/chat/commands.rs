//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to manage sessions and the results panel without sending
//! messages to the service.

use crate::results::ResultsTab;

use super::config::ChatMode;

/// A session named on the command line, by id or by its number in the
/// session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    /// One-based position in the last session listing.
    Index(usize),
    /// Session id.
    Id(String),
}

impl SessionRef {
    fn parse(argument: &str) -> Self {
        let number = argument.strip_prefix('#').unwrap_or(argument);
        match number.parse::<usize>() {
            Ok(index) if index > 0 => SessionRef::Index(index),
            _ => SessionRef::Id(argument.to_string()),
        }
    }
}

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the service.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// List sessions.
    Sessions,

    /// Create a session and make it active.
    /// `None` reuses the username of the active session.
    New(Option<String>),

    /// Make another session active and load its messages.
    Switch(SessionRef),

    /// Delete a session.
    Delete(SessionRef),

    /// Remove every message of the active session.
    Clear,

    /// Print the active session's messages.
    History,

    /// Change how replies are requested.
    Mode(ChatMode),

    /// Upload an image and attach it to the next message.
    Image(String),

    /// Drop the pending image.
    ClearImage,

    /// Show the results panel, optionally opening a tab.
    Results(Option<ResultsTab>),

    /// Show whether the service is reachable.
    Status,

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use agora::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/switch 2").is_some());
/// assert!(parse_command("What is in this picture?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "sessions" | "ls" => ChatCommand::Sessions,
        "new" => ChatCommand::New(argument.map(|s| s.to_string())),
        "switch" | "open" => match argument {
            Some(arg) => ChatCommand::Switch(SessionRef::parse(arg)),
            None => ChatCommand::Invalid("/switch requires a session id or number".to_string()),
        },
        "delete" | "rm" => match argument {
            Some(arg) => ChatCommand::Delete(SessionRef::parse(arg)),
            None => ChatCommand::Invalid("/delete requires a session id or number".to_string()),
        },
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "mode" => match argument {
            Some(arg) => match arg.parse::<ChatMode>() {
                Ok(mode) => ChatCommand::Mode(mode),
                Err(err) => ChatCommand::Invalid(format!("/mode: {err}")),
            },
            None => ChatCommand::Invalid("/mode expects 'stream' or 'structured'".to_string()),
        },
        "image" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearImage,
            Some(arg) => ChatCommand::Image(arg.to_string()),
            None => ChatCommand::Invalid("/image requires a file path".to_string()),
        },
        "results" => match argument {
            Some(arg) => match arg.parse::<ResultsTab>() {
                Ok(tab) => ChatCommand::Results(Some(tab)),
                Err(err) => ChatCommand::Invalid(format!("/results: {err}")),
            },
            None => ChatCommand::Results(None),
        },
        "status" => ChatCommand::Status,
        "config" => ChatCommand::ShowConfig,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /sessions              List sessions
  /new [username]        Create a session and switch to it
  /switch <id|#>         Switch to a session by id or list number
  /delete <id|#>         Delete a session by id or list number
  /clear                 Clear the active session's messages
  /history               Show the active session's messages
  /mode stream|structured
                         Stream replies or wait for complete ones
  /image <path>          Attach an image to the next message (or 'clear')
  /results [tab]         Show results (tabs: code, search, image)
  /status                Show whether the service is reachable
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
