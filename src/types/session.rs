use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::utils::time::parse_timestamp;

/// A chat session owned by the remote service.
///
/// Sessions are created and deleted by the user and are otherwise immutable
/// from the client's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier, e.g. `session-<uuid>`.
    pub id: String,

    /// The user the session belongs to.
    pub username: String,

    /// ISO 8601 timestamp of when the session was created.
    pub created_at: String,

    /// ISO 8601 timestamp of the last message in the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
}

impl Session {
    /// Creates a new session record.
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            created_at: created_at.into(),
            last_used: None,
        }
    }

    /// Parses `created_at`, accepting timestamps with or without an offset.
    pub fn created_at_time(&self) -> Option<OffsetDateTime> {
        parse_timestamp(&self.created_at)
    }
}

/// Body of `POST /api/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSessionRequest {
    /// Username for the new session.
    pub username: String,
}

impl NewSessionRequest {
    /// Creates a new request for the given username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn session_deserialization() {
        let json = json!({
            "id": "session-42",
            "username": "ada",
            "created_at": "2024-05-01T12:30:00.250000",
            "last_used": "2024-05-01T12:31:00"
        });
        let session: Session = serde_json::from_value(json).unwrap();
        assert_eq!(session.id, "session-42");
        assert_eq!(session.username, "ada");
        assert_eq!(session.last_used.as_deref(), Some("2024-05-01T12:31:00"));
        assert_eq!(
            session.created_at_time(),
            Some(datetime!(2024-05-01 12:30:00.25 UTC))
        );
    }

    #[test]
    fn session_without_last_used() {
        let session: Session = serde_json::from_value(json!({
            "id": "s",
            "username": "u",
            "created_at": "not a date"
        }))
        .unwrap();
        assert!(session.last_used.is_none());
        assert!(session.created_at_time().is_none());

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(
            value,
            json!({"id": "s", "username": "u", "created_at": "not a date"})
        );
    }

    #[test]
    fn new_session_request_serialization() {
        let request = NewSessionRequest::new("grace");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"username": "grace"})
        );
    }
}
