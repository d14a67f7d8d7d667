use serde::{Deserialize, Serialize};

/// A block of code produced by the code agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Language of the code, when the agent reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// The code itself.
    pub content: String,

    /// What the code does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    /// Output captured when the code was run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<String>,
}

impl CodeBlock {
    /// Creates a code block with just its content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            language: None,
            content: content.into(),
            explanation: None,
            execution_result: None,
        }
    }

    /// Sets the language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the explanation.
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Sets the execution result.
    pub fn with_execution_result(mut self, result: impl Into<String>) -> Self {
        self.execution_result = Some(result.into());
        self
    }
}

/// Older single-result shape for code output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResult {
    /// The code.
    pub code: String,

    /// What the code does.
    #[serde(default)]
    pub explanation: String,

    /// Output captured when the code was run.
    #[serde(default)]
    pub execution_result: String,
}

impl From<CodeResult> for CodeBlock {
    fn from(result: CodeResult) -> Self {
        CodeBlock {
            language: None,
            content: result.code,
            explanation: Some(result.explanation),
            execution_result: Some(result.execution_result),
        }
    }
}
