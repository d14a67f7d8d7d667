use serde::{Deserialize, Serialize};

/// Title given to search results converted from the summary shape.
pub const SEARCH_SUMMARY_TITLE: &str = "Search Results";

/// One result from the search agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the result.
    pub title: String,

    /// Link to the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Excerpt or synthesized answer.
    pub snippet: String,

    /// Source links backing the snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl SearchResult {
    /// Creates a search result.
    pub fn new(title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            snippet: snippet.into(),
            sources: None,
        }
    }

    /// Sets the url.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the sources.
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = Some(sources);
        self
    }
}

/// Older single-answer shape for search output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    /// The synthesized answer.
    pub answer: String,

    /// Source links.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl From<SearchSummary> for SearchResult {
    fn from(summary: SearchSummary) -> Self {
        SearchResult::new(SEARCH_SUMMARY_TITLE, summary.answer).with_sources(summary.sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_result_deserialization() {
        let result: SearchResult = serde_json::from_value(json!({
            "title": "Rust",
            "url": "https://www.rust-lang.org",
            "snippet": "A language empowering everyone"
        }))
        .unwrap();
        assert_eq!(result.url.as_deref(), Some("https://www.rust-lang.org"));
        assert!(result.sources.is_none());
    }

    #[test]
    fn summary_converts_with_fixed_title() {
        let summary = SearchSummary {
            answer: "42".to_string(),
            sources: vec!["https://example.com".to_string()],
        };
        let result = SearchResult::from(summary);
        assert_eq!(result.title, "Search Results");
        assert_eq!(result.snippet, "42");
        assert_eq!(
            result.sources,
            Some(vec!["https://example.com".to_string()])
        );
    }
}
