use serde::{Deserialize, Serialize};

/// A capability the model may invoke while generating.
///
/// Tools are passed through as opaque configuration; their results come back
/// folded into the model's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    /// Grounding with Google Search.
    GoogleSearch(GoogleSearch),
}

impl Tool {
    /// Create the Google Search tool.
    pub fn google_search() -> Self {
        Tool::GoogleSearch(GoogleSearch::default())
    }
}

/// Configuration of the Google Search tool. Currently empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleSearch {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn google_search_serialization() {
        assert_eq!(
            to_value(Tool::google_search()).unwrap(),
            json!({"googleSearch": {}})
        );
    }

    #[test]
    fn google_search_deserialization() {
        let tool: Tool = serde_json::from_value(json!({"googleSearch": {}})).unwrap();
        assert_eq!(tool, Tool::google_search());
    }
}
