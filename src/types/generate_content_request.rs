use serde::{Deserialize, Serialize};

use crate::types::{Content, GenerationConfig, GenerationParams, Tool};

/// Body of a `streamGenerateContent` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// The full conversation, oldest first.
    pub contents: Vec<Content>,

    /// Directive shaping the model's persona.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Tools the model may invoke.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,

    /// Sampling parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationParams>,
}

impl GenerateContentRequest {
    /// Combine a content list with the session's static configuration.
    pub fn new(contents: Vec<Content>, config: &GenerationConfig) -> Self {
        Self {
            contents,
            system_instruction: config
                .system_instruction
                .as_deref()
                .map(Content::instruction),
            tools: config.tools.clone(),
            generation_config: Some(config.params()),
        }
    }
}
