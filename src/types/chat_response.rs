use serde::{Deserialize, Serialize};

use crate::types::{
    CodeResult, ImageAnalysisResult, Message, MessageMetadata, SearchSummary, Usage,
};

/// Response of the structured `POST /api/chat` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Session the answer belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// The agents' answer.
    pub result: ChatResult,

    /// Token accounting.
    #[serde(default)]
    pub usage: Usage,
}

/// The answer and optional per-agent results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResult {
    /// Markdown answer.
    pub answer: String,

    /// Code agent output.
    #[serde(default)]
    pub code_result: Option<CodeResult>,

    /// Search agent output.
    #[serde(default)]
    pub search_result: Option<SearchSummary>,

    /// Image agent output.
    #[serde(default)]
    pub image_analysis_result: Option<ImageAnalysisResult>,
}

impl ChatResponse {
    /// Converts the response into an assistant message for `session_id`.
    pub fn into_message(self, session_id: &str) -> Message {
        let ChatResult {
            answer,
            code_result,
            search_result,
            image_analysis_result,
        } = self.result;
        let metadata = MessageMetadata {
            code_result,
            search_result,
            image_analysis_result,
            ..MessageMetadata::default()
        };
        let mut message = Message::assistant(answer, session_id);
        message.metadata = Some(metadata.reconciled());
        message
    }
}
