//! Service endpoint configuration.
//!
//! The chat service is located by a base URL; every endpoint the client calls
//! hangs off it. A websocket URL is carried alongside for front ends that
//! want to display or use it.

use std::env;

use url::Url;

use crate::error::{Error, Result};

/// Base URL used when `AGORA_API_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Websocket URL used when `AGORA_WS_URL` is not set.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

/// Environment variable holding the base URL.
pub const API_BASE_URL_ENV: &str = "AGORA_API_BASE_URL";

/// Environment variable holding the websocket URL.
pub const WS_URL_ENV: &str = "AGORA_WS_URL";

/// Where the chat service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: Url,
    ws_url: Url,
}

impl ApiConfig {
    /// Creates a configuration from explicit URLs.
    pub fn new(base_url: &str, ws_url: &str) -> Result<Self> {
        let base_url = parse_base(base_url)?;
        let ws_url = Url::parse(ws_url)
            .map_err(|e| Error::url(format!("invalid websocket URL '{ws_url}': {e}"), Some(e)))?;
        Ok(Self { base_url, ws_url })
    }

    /// Reads the configuration from the environment, falling back to the
    /// local development defaults.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var(API_BASE_URL_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let ws_url = env::var(WS_URL_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WS_URL.to_string());
        Self::new(&base_url, &ws_url)
    }

    /// Replaces the base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base(base_url)?;
        Ok(self)
    }

    /// Replaces the websocket URL.
    pub fn with_ws_url(mut self, ws_url: &str) -> Result<Self> {
        self.ws_url = Url::parse(ws_url)
            .map_err(|e| Error::url(format!("invalid websocket URL '{ws_url}': {e}"), Some(e)))?;
        Ok(self)
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The websocket URL.
    pub fn ws_url(&self) -> &Url {
        &self.ws_url
    }

    /// `GET`/`POST /api/sessions`
    pub fn sessions_url(&self) -> Result<Url> {
        self.endpoint(&["api", "sessions"])
    }

    /// `DELETE /api/sessions/{id}`
    pub fn session_url(&self, session_id: &str) -> Result<Url> {
        self.endpoint(&["api", "sessions", session_id])
    }

    /// `GET /api/sessions/{id}/messages`
    pub fn session_messages_url(&self, session_id: &str) -> Result<Url> {
        self.endpoint(&["api", "sessions", session_id, "messages"])
    }

    /// `POST /api/sessions/{id}/clear`
    pub fn session_clear_url(&self, session_id: &str) -> Result<Url> {
        self.endpoint(&["api", "sessions", session_id, "clear"])
    }

    /// `POST /api/chat`
    pub fn chat_url(&self) -> Result<Url> {
        self.endpoint(&["api", "chat"])
    }

    /// `POST /api/chat/stream`
    pub fn chat_stream_url(&self) -> Result<Url> {
        self.endpoint(&["api", "chat", "stream"])
    }

    /// `POST /api/upload-image`
    pub fn upload_image_url(&self) -> Result<Url> {
        self.endpoint(&["api", "upload-image"])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::url(format!("'{}' cannot be a base URL", self.base_url), None))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default base URL should parse"),
            ws_url: Url::parse(DEFAULT_WS_URL).expect("default websocket URL should parse"),
        }
    }
}

fn parse_base(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| Error::url(format!("invalid base URL '{base_url}': {e}"), Some(e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::url(format!("'{base_url}' cannot be a base URL"), None));
    }
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::url(
            format!("unsupported scheme '{scheme}' in base URL"),
            None,
        )),
    }
}
