//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::fmt;
use std::str::FromStr;

use arrrg_derive::CommandLine;

use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// Command-line arguments for the agora-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the chat service.
    #[arrrg(optional, "Service base URL (default: $AGORA_API_BASE_URL or http://localhost:8000)", "URL")]
    pub base_url: Option<String>,

    /// Websocket URL of the chat service.
    #[arrrg(optional, "Websocket URL (default: $AGORA_WS_URL or ws://localhost:8000/ws)", "URL")]
    pub ws_url: Option<String>,

    /// Create a session for this user at start.
    #[arrrg(optional, "Create a session for this username at start", "USERNAME")]
    pub username: Option<String>,

    /// Resume an existing session at start.
    #[arrrg(optional, "Resume the session with this id", "SESSION_ID")]
    pub session: Option<String>,

    /// Wait for complete replies instead of streaming them.
    #[arrrg(flag, "Use structured (non-streaming) replies")]
    pub structured: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Print replies as raw markdown.
    #[arrrg(flag, "Print replies as raw markdown")]
    pub no_markdown: bool,
}

/// How replies are requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    /// Replies are streamed chunk by chunk.
    #[default]
    Stream,
    /// Replies arrive complete, with results attached.
    Structured,
}

impl ChatMode {
    /// Returns the mode's name.
    pub fn as_str(self) -> &'static str {
        match self {
            ChatMode::Stream => "stream",
            ChatMode::Structured => "structured",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" | "streaming" => Ok(ChatMode::Stream),
            "structured" => Ok(ChatMode::Structured),
            _ => Err(format!("unknown mode '{s}'; expected stream or structured")),
        }
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments and the environment.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Where the service lives.
    pub api: ApiConfig,

    /// Username for a session created at start.
    pub username: Option<String>,

    /// Session to resume at start.
    pub session_id: Option<String>,

    /// How replies are requested.
    pub mode: ChatMode,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to render replies from markdown.
    pub use_markdown: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Service: http://localhost:8000
    /// - Mode: stream
    /// - Color: enabled
    /// - Markdown: enabled
    pub fn new() -> Self {
        Self {
            api: ApiConfig::default(),
            username: None,
            session_id: None,
            mode: ChatMode::Stream,
            use_color: true,
            use_markdown: true,
        }
    }

    /// Resolves command-line arguments on top of `api`.
    pub fn resolve(args: ChatArgs, api: ApiConfig) -> Result<Self> {
        let mut api = api;
        if let Some(base_url) = &args.base_url {
            api = api.with_base_url(base_url)?;
        }
        if let Some(ws_url) = &args.ws_url {
            api = api.with_ws_url(ws_url)?;
        }
        let username = args.username.filter(|u| !u.trim().is_empty());
        let session_id = args.session.filter(|s| !s.trim().is_empty());
        if username.is_some() && session_id.is_some() {
            return Err(Error::validation(
                "--username and --session cannot be used together",
                Some("session".to_string()),
            ));
        }
        Ok(ChatConfig {
            api,
            username,
            session_id,
            mode: if args.structured {
                ChatMode::Structured
            } else {
                ChatMode::Stream
            },
            use_color: !args.no_color,
            use_markdown: !args.no_markdown,
        })
    }

    /// Sets the service configuration.
    pub fn with_api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }

    /// Sets the username for a session created at start.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the session to resume at start.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the reply mode.
    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Disables markdown rendering.
    pub fn without_markdown(mut self) -> Self {
        self.use_markdown = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        ChatConfig::resolve(args, ApiConfig::from_env()?)
    }
}
