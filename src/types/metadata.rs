use serde::{Deserialize, Serialize};

use crate::types::{
    CodeBlock, CodeResult, ImageAnalysis, ImageAnalysisResult, SearchResult, SearchSummary,
};

/// Agent results attached to a message.
///
/// The service has used two shapes over time. The list-shaped fields
/// (`code`, `search_results`, `image_analysis`) are canonical; the
/// single-result fields (`code_result`, `search_result`,
/// `image_analysis_result`) are what older messages and the structured
/// endpoint carry. [`MessageMetadata::reconciled`] folds the latter into the
/// former.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Code blocks.
    #[serde(default)]
    pub code: Vec<CodeBlock>,

    /// Search results.
    #[serde(default)]
    pub search_results: Vec<SearchResult>,

    /// Image analysis.
    #[serde(default)]
    pub image_analysis: Option<ImageAnalysis>,

    /// Single code result in the older shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_result: Option<CodeResult>,

    /// Search answer in the older shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_result: Option<SearchSummary>,

    /// Image result in the older shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_analysis_result: Option<ImageAnalysisResult>,
}

impl MessageMetadata {
    /// Returns the canonical form: older-shape results converted into the
    /// list fields wherever those are empty, and the older fields dropped.
    pub fn reconciled(&self) -> MessageMetadata {
        let mut out = MessageMetadata {
            code: self.code.clone(),
            search_results: self.search_results.clone(),
            image_analysis: self.image_analysis.clone(),
            ..MessageMetadata::default()
        };
        if out.code.is_empty()
            && let Some(result) = &self.code_result
        {
            out.code = vec![result.clone().into()];
        }
        if out.search_results.is_empty()
            && let Some(summary) = &self.search_result
        {
            out.search_results = vec![summary.clone().into()];
        }
        if out.image_analysis.is_none()
            && let Some(result) = &self.image_analysis_result
        {
            out.image_analysis = Some(result.clone().into());
        }
        out
    }

    /// Fills the older-shape fields that are unset from the given values.
    pub fn absorb_legacy(
        &mut self,
        code_result: Option<&CodeResult>,
        search_result: Option<&SearchSummary>,
        image_analysis_result: Option<&ImageAnalysisResult>,
    ) {
        if self.code_result.is_none() {
            self.code_result = code_result.cloned();
        }
        if self.search_result.is_none() {
            self.search_result = search_result.cloned();
        }
        if self.image_analysis_result.is_none() {
            self.image_analysis_result = image_analysis_result.cloned();
        }
    }

    /// Returns true if there is any code, search or image result in either shape.
    pub fn has_results(&self) -> bool {
        let canonical = self.reconciled();
        !canonical.code.is_empty()
            || !canonical.search_results.is_empty()
            || canonical.image_analysis.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_default() {
        let metadata: MessageMetadata = serde_json::from_value(json!({})).unwrap();
        assert_eq!(metadata, MessageMetadata::default());
        assert!(!metadata.has_results());
        assert_eq!(
            serde_json::to_value(&metadata).unwrap(),
            json!({"code": [], "search_results": [], "image_analysis": null})
        );
    }

    #[test]
    fn reconciles_legacy_fields() {
        let metadata: MessageMetadata = serde_json::from_value(json!({
            "code_result": {"code": "1+1", "explanation": "sum", "execution_result": "2"},
            "search_result": {"answer": "Paris", "sources": ["https://a.example"]},
            "image_analysis_result": {"description": "a dog", "objects": ["dog"], "scene_type": "park"}
        }))
        .unwrap();
        assert!(metadata.has_results());

        let canonical = metadata.reconciled();
        assert_eq!(canonical.code.len(), 1);
        assert_eq!(canonical.code[0].content, "1+1");
        assert_eq!(canonical.search_results[0].title, "Search Results");
        assert_eq!(canonical.search_results[0].snippet, "Paris");
        let image = canonical.image_analysis.unwrap();
        assert_eq!(image.analysis, "a dog");
        assert_eq!(image.detections()[0].label, "dog");
        assert_eq!(image.scene_type.as_deref(), Some("park"));
        assert!(canonical.code_result.is_none());
        assert!(canonical.search_result.is_none());
        assert!(canonical.image_analysis_result.is_none());
    }

    #[test]
    fn canonical_fields_win_over_legacy() {
        let metadata = MessageMetadata {
            code: vec![CodeBlock::new("new")],
            code_result: Some(CodeResult {
                code: "old".to_string(),
                explanation: String::new(),
                execution_result: String::new(),
            }),
            ..MessageMetadata::default()
        };
        let canonical = metadata.reconciled();
        assert_eq!(canonical.code, vec![CodeBlock::new("new")]);
    }

    #[test]
    fn absorb_legacy_keeps_existing_values() {
        let mine = SearchSummary {
            answer: "mine".to_string(),
            sources: vec![],
        };
        let theirs = SearchSummary {
            answer: "theirs".to_string(),
            sources: vec![],
        };
        let mut metadata = MessageMetadata {
            search_result: Some(mine.clone()),
            ..MessageMetadata::default()
        };
        metadata.absorb_legacy(None, Some(&theirs), None);
        assert_eq!(metadata.search_result, Some(mine));
        assert!(metadata.code_result.is_none());
    }
}
