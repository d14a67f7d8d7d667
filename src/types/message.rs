use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::MessageMetadata;

/// Text shown in place of an assistant reply when a stream fails.
pub const STREAM_ERROR_TEXT: &str = "Error: Failed to stream response. Please try again.";

static LOCAL_ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Role of the author of a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The human user.
    User,

    /// The assistant, as named by the client.
    Assistant,

    /// System notices.
    System,

    /// The assistant, as named by the service when replaying history.
    Model,
}

impl MessageRole {
    /// Returns true for both names the assistant goes by.
    pub fn is_assistant(self) -> bool {
        matches!(self, MessageRole::Assistant | MessageRole::Model)
    }

    /// Returns the wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Model => "model",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a session's thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier; the service omits it, the client assigns local ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Who wrote the message.
    pub role: MessageRole,

    /// Message text, markdown for anything but user messages.
    pub content: String,

    /// ISO 8601 timestamp, when the service provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Agent results attached to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,

    /// Session the message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Message {
    /// Creates a message with a fresh local id and empty metadata.
    pub fn new(role: MessageRole, content: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: Some(local_message_id()),
            role,
            content: content.into(),
            timestamp: None,
            metadata: Some(MessageMetadata::default()),
            session_id: Some(session_id.into()),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content, session_id)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content, session_id)
    }

    /// The synthetic assistant reply substituted when a stream fails.
    pub fn stream_error(session_id: impl Into<String>) -> Self {
        Self::assistant(STREAM_ERROR_TEXT, session_id)
    }

    /// Returns the attached metadata, or an empty set.
    pub fn metadata_or_default(&self) -> MessageMetadata {
        self.metadata.clone().unwrap_or_default()
    }

    /// Returns true if the message carries any code, search or image result.
    pub fn has_results(&self) -> bool {
        self.metadata.as_ref().is_some_and(MessageMetadata::has_results)
    }
}

/// Generate an identifier for a message that exists only on the client.
///
/// Ids are unique within the process even when generated within the same
/// clock tick.
pub fn local_message_id() -> String {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    let seq = LOCAL_ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("local-{nanos}-{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodeBlock;
    use serde_json::json;

    #[test]
    fn role_round_names() {
        for (role, name) in [
            (MessageRole::User, "user"),
            (MessageRole::Assistant, "assistant"),
            (MessageRole::System, "system"),
            (MessageRole::Model, "model"),
        ] {
            assert_eq!(serde_json::to_value(role).unwrap(), json!(name));
            assert_eq!(role.to_string(), name);
        }
        assert!(MessageRole::Model.is_assistant());
        assert!(MessageRole::Assistant.is_assistant());
        assert!(!MessageRole::User.is_assistant());
        assert!(!MessageRole::System.is_assistant());
    }

    #[test]
    fn history_message_deserialization() {
        let message: Message = serde_json::from_value(json!({
            "role": "model",
            "content": "Here you go",
            "timestamp": "2024-05-01T12:30:00",
            "metadata": {}
        }))
        .unwrap();
        assert!(message.id.is_none());
        assert!(message.session_id.is_none());
        assert_eq!(message.role, MessageRole::Model);
        assert_eq!(message.metadata, Some(MessageMetadata::default()));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = serde_json::from_value::<Message>(json!({
            "role": "tool",
            "content": "x"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn local_ids_are_unique() {
        let a = Message::user("hi", "s");
        let b = Message::assistant("hello", "s");
        assert_ne!(a.id, b.id);
        assert!(a.id.as_deref().unwrap().starts_with("local-"));
    }

    #[test]
    fn stream_error_message() {
        let message = Message::stream_error("s1");
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.content, STREAM_ERROR_TEXT);
        assert_eq!(message.session_id.as_deref(), Some("s1"));
        assert!(!message.has_results());
    }

    #[test]
    fn has_results_follows_metadata() {
        let mut message = Message::assistant("code", "s");
        assert!(!message.has_results());
        message.metadata = Some(MessageMetadata {
            code: vec![CodeBlock::new("print(1)")],
            ..MessageMetadata::default()
        });
        assert!(message.has_results());
        message.metadata = None;
        assert!(!message.has_results());
        assert_eq!(message.metadata_or_default(), MessageMetadata::default());
    }
}
