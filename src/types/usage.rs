use serde::{Deserialize, Serialize};

/// Token accounting reported by the service for one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,

    /// Tokens generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,

    /// Prompt plus completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,

    /// Model requests made by the agents for this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<u64>,
}

impl Usage {
    /// Returns the total, computing it from its parts when absent.
    pub fn total(&self) -> u64 {
        self.total_tokens.unwrap_or_else(|| {
            self.prompt_tokens.unwrap_or(0) + self.completion_tokens.unwrap_or(0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn total_prefers_reported_value() {
        let usage: Usage = serde_json::from_value(json!({
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "total_tokens": 16
        }))
        .unwrap();
        assert_eq!(usage.total(), 16);
    }

    #[test]
    fn total_falls_back_to_sum() {
        let usage: Usage = serde_json::from_value(json!({"prompt_tokens": 7, "completion_tokens": 3})).unwrap();
        assert_eq!(usage.total(), 10);
        assert_eq!(Usage::default().total(), 0);
    }
}
