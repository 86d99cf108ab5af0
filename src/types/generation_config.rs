use serde::{Deserialize, Serialize};

use crate::types::Tool;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.6;

/// Default cap on generated tokens per reply.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 65535;

/// Static generation settings shared by every request of a session.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum number of tokens the model may produce per reply.
    pub max_output_tokens: u32,

    /// Tools the model may use.
    pub tools: Vec<Tool>,

    /// Fixed directive prepended to every request; never shown in the transcript.
    pub system_instruction: Option<String>,
}

impl GenerationConfig {
    /// Create a configuration with the default temperature and token limit and no tools.
    pub fn new() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            tools: Vec::new(),
            system_instruction: None,
        }
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum output tokens.
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Adds a tool.
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// The `generationConfig` object of a request.
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: Some(self.temperature),
            max_output_tokens: Some(self.max_output_tokens),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sampling parameters as they appear on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}
