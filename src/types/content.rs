use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The producer of a piece of content, as named by the Gemini API.
///
/// The API accepts exactly these two roles inside `contents`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    /// Content written by the user.
    User,

    /// Content produced by the model.
    Model,
}

/// A single unit of multi-part content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Inline text for this part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Set when the part carries the model's reasoning rather than its answer.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thought: bool,

    /// Any other payload (function calls, executable code, inline data, ...).
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Part {
    /// Create a new text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Returns the answer text of this part, skipping thought parts.
    pub fn answer_text(&self) -> Option<&str> {
        if self.thought {
            None
        } else {
            self.text.as_deref()
        }
    }
}

/// Role-tagged content, the unit of conversation history sent to the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Who produced the content. Absent for system instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ContentRole>,

    /// Ordered parts making up the content.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create content with one text part and the given role.
    pub fn new_with_text(text: impl Into<String>, role: ContentRole) -> Self {
        Self {
            role: Some(role),
            parts: vec![Part::text(text)],
        }
    }

    /// Create role-less content with one text part, as used for system instructions.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated answer text of all parts, or `None` if no part carries text.
    pub fn text(&self) -> Option<String> {
        let mut texts = self.parts.iter().filter_map(Part::answer_text).peekable();
        texts.peek()?;
        Some(texts.collect())
    }
}
