use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat` and `POST /api/chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Session to continue.
    pub session_id: String,

    /// The user's message.
    pub message: String,

    /// Previously uploaded image to analyze with this message.
    pub image_url: Option<String>,
}

impl ChatRequest {
    /// Creates a request without an image.
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            image_url: None,
        }
    }

    /// Attaches an image; empty urls are treated as absent.
    pub fn with_image_url(mut self, image_url: Option<&str>) -> Self {
        self.image_url = image_url.filter(|url| !url.is_empty()).map(String::from);
        self
    }
}
