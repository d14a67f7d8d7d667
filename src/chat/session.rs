//! Chat session state and the calls that change it.
//!
//! [`ChatSession`] holds everything the REPL shows: the session list, the
//! active session, its thread, a pending image and the results panel.  All
//! service access goes through a [`ChatBackend`] so the state machine can be
//! driven without a network.

use std::path::Path;

use crate::client::{AgoraClient, ChunkStream};
use crate::error::{Error, Result};
use crate::reducer::{StreamReducer, reduce_stream};
use crate::render::Renderer;
use crate::results::{ResultsPanel, ResultsTab};
use crate::types::{ImageUploadResponse, Message, Session};

use super::commands::SessionRef;
use super::config::{ChatConfig, ChatMode};

/// Shown when a structured send fails.
const SEND_FAILED: &str = "Failed to send message. Please try again.";

/// The service calls a chat session needs.
///
/// [`AgoraClient`] is the production implementation.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// List all sessions.
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// Create a session for `username`.
    async fn create_session(&self, username: &str) -> Result<Session>;

    /// Fetch a session's thread, oldest first.
    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Delete a session.
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Remove every message of a session.
    async fn clear_session(&self, session_id: &str) -> Result<()>;

    /// Send a message and wait for the complete reply.
    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<Message>;

    /// Send a message and stream the reply.
    async fn stream_chat(
        &self,
        session_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<ChunkStream>;

    /// Upload an image file.
    async fn upload_image(&self, path: &Path) -> Result<ImageUploadResponse>;
}

#[async_trait::async_trait]
impl ChatBackend for AgoraClient {
    async fn list_sessions(&self) -> Result<Vec<Session>> {
        AgoraClient::list_sessions(self).await
    }

    async fn create_session(&self, username: &str) -> Result<Session> {
        AgoraClient::create_session(self, username).await
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        AgoraClient::get_messages(self, session_id).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        AgoraClient::delete_session(self, session_id).await
    }

    async fn clear_session(&self, session_id: &str) -> Result<()> {
        AgoraClient::clear_session(self, session_id).await
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<Message> {
        AgoraClient::send_message(self, session_id, content, image_url).await
    }

    async fn stream_chat(
        &self,
        session_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<ChunkStream> {
        AgoraClient::stream_chat(self, session_id, content, image_url).await
    }

    async fn upload_image(&self, path: &Path) -> Result<ImageUploadResponse> {
        AgoraClient::upload_image(self, path).await
    }
}

/// Whether the service answered the last session listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiStatus {
    /// No listing has been attempted.
    #[default]
    Unknown,
    /// The last listing succeeded.
    Connected,
    /// The last listing failed.
    Disconnected,
}

impl ApiStatus {
    /// Returns a short description.
    pub fn as_str(self) -> &'static str {
        match self {
            ApiStatus::Unknown => "unknown",
            ApiStatus::Connected => "connected",
            ApiStatus::Disconnected => "disconnected",
        }
    }
}

/// Client-side state of the chat application.
pub struct ChatSession<B: ChatBackend = AgoraClient> {
    backend: B,
    config: ChatConfig,
    sessions: Vec<Session>,
    active: Option<Session>,
    messages: Vec<Message>,
    pending_image: Option<ImageUploadResponse>,
    results_tab: usize,
    results_open: bool,
    api_status: ApiStatus,
}

impl<B: ChatBackend> ChatSession<B> {
    /// Creates a session with no sessions loaded.
    pub fn new(backend: B, config: ChatConfig) -> Self {
        Self {
            backend,
            config,
            sessions: Vec::new(),
            active: None,
            messages: Vec::new(),
            pending_image: None,
            results_tab: 0,
            results_open: false,
            api_status: ApiStatus::Unknown,
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Known sessions, in listing order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// The active session.
    pub fn active(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    /// The active session's id.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.id.as_str())
    }

    /// The active session's thread.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The image attached to the next message.
    pub fn pending_image(&self) -> Option<&ImageUploadResponse> {
        self.pending_image.as_ref()
    }

    /// Whether the last session listing reached the service.
    pub fn api_status(&self) -> ApiStatus {
        self.api_status
    }

    /// The reply mode.
    pub fn mode(&self) -> ChatMode {
        self.config.mode
    }

    /// Whether the results panel is open.
    pub fn results_open(&self) -> bool {
        self.results_open
    }

    /// Change the reply mode.  Streaming closes the results panel.
    pub fn set_mode(&mut self, mode: ChatMode) {
        self.config.mode = mode;
        if mode == ChatMode::Stream {
            self.results_open = false;
        }
    }

    /// Reload the session list and record whether the service answered.
    pub async fn refresh_sessions(&mut self) -> Result<&[Session]> {
        match self.backend.list_sessions().await {
            Ok(sessions) => {
                self.sessions = sessions;
                self.api_status = ApiStatus::Connected;
                Ok(&self.sessions)
            }
            Err(err) => {
                self.api_status = ApiStatus::Disconnected;
                Err(err)
            }
        }
    }

    /// Create a session for `username` and make it active with an empty
    /// thread.
    pub async fn create_session(&mut self, username: &str) -> Result<&Session> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::validation(
                "username must not be empty",
                Some("username".to_string()),
            ));
        }
        let session = self.backend.create_session(username).await?;
        self.sessions.push(session.clone());
        self.messages.clear();
        self.reset_results();
        Ok(self.active.insert(session))
    }

    /// Make the referenced session active and load its thread.
    ///
    /// The session becomes active even when its messages cannot be loaded;
    /// the thread is then empty and the load error is returned.
    pub async fn switch(&mut self, reference: &SessionRef) -> Result<&Session> {
        let session = self.resolve(reference)?.clone();
        self.active = Some(session.clone());
        self.reset_results();
        match self.backend.get_messages(&session.id).await {
            Ok(messages) => self.messages = messages,
            Err(err) => {
                self.messages.clear();
                return Err(err);
            }
        }
        Ok(self.active.get_or_insert(session))
    }

    /// Delete the referenced session.  Deleting the active session clears
    /// the thread.
    pub async fn delete(&mut self, reference: &SessionRef) -> Result<Session> {
        let session = self.resolve(reference)?.clone();
        self.backend.delete_session(&session.id).await?;
        self.sessions.retain(|s| s.id != session.id);
        if self.active_id() == Some(session.id.as_str()) {
            self.active = None;
            self.messages.clear();
            self.reset_results();
        }
        Ok(session)
    }

    /// Remove every message of the active session.
    pub async fn clear(&mut self) -> Result<()> {
        let session_id = self.require_active()?.to_string();
        self.backend.clear_session(&session_id).await?;
        self.messages.clear();
        self.reset_results();
        Ok(())
    }

    /// Upload `path` and attach it to the next message.
    pub async fn attach_image(&mut self, path: &Path) -> Result<&ImageUploadResponse> {
        let upload = self.backend.upload_image(path).await?;
        Ok(self.pending_image.insert(upload))
    }

    /// Drop the pending image, returning it.
    pub fn clear_image(&mut self) -> Option<ImageUploadResponse> {
        self.pending_image.take()
    }

    /// Send `content` to the active session and render the reply.
    ///
    /// The user's message joins the thread before the call.  In stream mode
    /// a failed stream adds a synthetic error reply instead of returning an
    /// error.  The pending image is consumed whatever the outcome.
    pub async fn send(&mut self, content: &str, renderer: &mut dyn Renderer) -> Result<()> {
        let session_id = self.require_active()?.to_string();
        let image = self.pending_image.take();
        let image_url = image.as_ref().map(|i| i.image_url.as_str());
        self.messages.push(Message::user(content, &session_id));

        match self.config.mode {
            ChatMode::Structured => {
                let reply = match self
                    .backend
                    .send_message(&session_id, content, image_url)
                    .await
                {
                    Ok(reply) => reply,
                    Err(err) => {
                        tracing::warn!(error = %err, session_id = %session_id, "send failed");
                        renderer.print_error(SEND_FAILED);
                        return Err(err);
                    }
                };
                renderer.print_message(&reply);
                self.messages.push(reply);
                if self
                    .messages
                    .iter()
                    .any(|m| m.role.is_assistant() && m.has_results())
                {
                    self.show_results(None, renderer);
                }
            }
            ChatMode::Stream => {
                renderer.start_reply();
                let reply = match self
                    .stream_reply(&session_id, content, image_url, renderer)
                    .await
                {
                    Ok(Some(reply)) => reply,
                    Ok(None) => {
                        tracing::debug!(session_id = %session_id, "stream ended without a reply");
                        renderer.finish_reply(&Message::assistant("", &session_id));
                        return Ok(());
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, session_id = %session_id, "stream failed");
                        Message::stream_error(&session_id)
                    }
                };
                renderer.finish_reply(&reply);
                self.messages.push(reply);
            }
        }
        Ok(())
    }

    async fn stream_reply(
        &self,
        session_id: &str,
        content: &str,
        image_url: Option<&str>,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<Message>> {
        let stream = self
            .backend
            .stream_chat(session_id, content, image_url)
            .await?;
        reduce_stream(stream, StreamReducer::new(session_id), |message| {
            renderer.update_reply(&message.content)
        })
        .await
    }

    /// The results gathered from the thread.
    pub fn results(&self) -> ResultsPanel {
        ResultsPanel::from_messages(&self.messages)
    }

    /// Open the results panel, on `tab` when given, and print it.
    pub fn show_results(&mut self, tab: Option<ResultsTab>, renderer: &mut dyn Renderer) {
        let panel = self.results();
        if let Some(tab) = tab {
            match panel.index_of(tab) {
                Some(index) => self.results_tab = index,
                None => {
                    renderer.print_info(&format!("No {} results.", tab.label().to_lowercase()));
                    return;
                }
            }
        }
        self.results_tab = panel.clamp_index(self.results_tab);
        self.results_open = true;
        renderer.print_results(&panel, self.results_tab);
    }

    /// Print the active thread.
    pub fn print_history(&self, renderer: &mut dyn Renderer) {
        if self.messages.is_empty() {
            renderer.print_info("No messages yet.");
            return;
        }
        for message in &self.messages {
            renderer.print_message(message);
        }
    }

    /// One line describing the connection.
    pub fn status_line(&self) -> String {
        format!(
            "API: {} ({})",
            self.api_status.as_str(),
            self.config.api.base_url()
        )
    }

    fn resolve(&self, reference: &SessionRef) -> Result<&Session> {
        let found = match reference {
            SessionRef::Index(index) => index.checked_sub(1).and_then(|i| self.sessions.get(i)),
            SessionRef::Id(id) => self.sessions.iter().find(|s| &s.id == id),
        };
        found.ok_or_else(|| {
            let shown = match reference {
                SessionRef::Index(index) => format!("#{index}"),
                SessionRef::Id(id) => id.clone(),
            };
            Error::validation(
                format!("no session {shown}; run /sessions to list them"),
                Some("session".to_string()),
            )
        })
    }

    fn require_active(&self) -> Result<&str> {
        self.active_id().ok_or_else(|| {
            Error::validation(
                "no active session; use /new <username> or /switch <id|#>",
                Some("session".to_string()),
            )
        })
    }

    fn reset_results(&mut self) {
        self.results_tab = 0;
        self.results_open = false;
    }
}
