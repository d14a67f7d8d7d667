use serde::{Deserialize, Serialize};

use crate::types::{
    CodeResult, ImageAnalysisResult, MessageMetadata, MessageRole, SearchSummary, Usage,
};

/// Kind of a streamed chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    /// Carries the full text generated so far.
    Content,

    /// Closes the turn and carries the authoritative metadata.
    Final,

    /// Any kind this client does not know about.
    #[serde(other)]
    Unknown,
}

/// One parsed server-sent event from `/api/chat/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Kind of chunk.
    #[serde(rename = "type")]
    pub r#type: ChunkType,

    /// Author of the text; the service echoes the user's message first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,

    /// Full text so far (not a delta).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Agent results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,

    /// Code result in the older top-level shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_result: Option<CodeResult>,

    /// Search answer in the older top-level shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_result: Option<SearchSummary>,

    /// Image result in the older top-level shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_analysis_result: Option<ImageAnalysisResult>,

    /// Token accounting, usually on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// When the service emitted the chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl StreamChunk {
    fn bare(r#type: ChunkType) -> Self {
        Self {
            r#type,
            role: None,
            content: None,
            metadata: None,
            code_result: None,
            search_result: None,
            image_analysis_result: None,
            usage: None,
            timestamp: None,
        }
    }

    /// Creates a content chunk.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::bare(ChunkType::Content)
        }
    }

    /// Creates a final chunk carrying metadata.
    pub fn final_chunk(metadata: MessageMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::bare(ChunkType::Final)
        }
    }

    /// Sets the role.
    pub fn with_role(mut self, role: MessageRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Returns true if the chunk echoes the user's own message.
    pub fn is_user_echo(&self) -> bool {
        self.role == Some(MessageRole::User)
    }

    /// Returns all results this chunk carries, in canonical form.
    ///
    /// Older-shape results may sit inside `metadata` or at the top level of
    /// the chunk; both are folded in.
    pub fn results(&self) -> Option<MessageMetadata> {
        let has_legacy = self.code_result.is_some()
            || self.search_result.is_some()
            || self.image_analysis_result.is_some();
        if self.metadata.is_none() && !has_legacy {
            return None;
        }
        let mut metadata = self.metadata.clone().unwrap_or_default();
        metadata.absorb_legacy(
            self.code_result.as_ref(),
            self.search_result.as_ref(),
            self.image_analysis_result.as_ref(),
        );
        Some(metadata.reconciled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_chunk_from_service() {
        let chunk: StreamChunk = serde_json::from_value(json!({
            "type": "content",
            "role": "model",
            "content": "Hello",
            "timestamp": "2024-05-01T12:30:00"
        }))
        .unwrap();
        assert_eq!(chunk.r#type, ChunkType::Content);
        assert_eq!(chunk.role, Some(MessageRole::Model));
        assert_eq!(chunk.content.as_deref(), Some("Hello"));
        assert!(!chunk.is_user_echo());
        assert!(chunk.results().is_none());
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let chunk: StreamChunk = serde_json::from_value(json!({"type": "heartbeat"})).unwrap();
        assert_eq!(chunk.r#type, ChunkType::Unknown);
    }

    #[test]
    fn missing_type_is_rejected() {
        assert!(serde_json::from_value::<StreamChunk>(json!({"content": "x"})).is_err());
    }

    #[test]
    fn final_chunk_results_fold_top_level_legacy() {
        let chunk: StreamChunk = serde_json::from_value(json!({
            "type": "final",
            "content": "done",
            "code_result": {"code": "x", "explanation": "e", "execution_result": "r"},
            "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
        }))
        .unwrap();
        let results = chunk.results().unwrap();
        assert_eq!(results.code.len(), 1);
        assert_eq!(results.code[0].content, "x");
        assert!(results.code_result.is_none());
        assert_eq!(chunk.usage.unwrap().total(), 3);
    }

    #[test]
    fn user_echo() {
        let chunk = StreamChunk::content("hi").with_role(MessageRole::User);
        assert!(chunk.is_user_echo());
    }
}
