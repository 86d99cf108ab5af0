//! Configuration for the travel planner.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the session runs with.

use arrrg_derive::CommandLine;

use crate::error::{Error, Result};
use crate::types::{
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, GenerationConfig, Model, Tool,
};

/// The planner persona sent as the system instruction on every request.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = concat!(
    "你是一位頂級的旅遊規劃師，專精於亞洲文化深度旅行。",
    "你的任務是根據用戶的需求，提供包含「景點」、「美食」和「交通」的詳細建議。",
    "回答風格必須是熱情、專業且富有個人見解的。",
    "請確保每一次的回覆都像一篇精美的小文章，並以條列式重點結尾。",
);

/// Highest temperature the API accepts.
const MAX_TEMPERATURE: f64 = 2.0;

/// Command-line arguments for the travelbot tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct TravelArgs {
    /// Model to use.
    #[arrrg(optional, "Model to use (default: gemini-2.5-flash)", "MODEL")]
    pub model: Option<String>,

    /// System instruction replacing the built-in planner persona.
    #[arrrg(optional, "System instruction for the planner", "PROMPT")]
    pub system: Option<String>,

    /// Maximum output tokens per reply.
    #[arrrg(optional, "Max output tokens per reply (default: 65535)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature, 0.0 to 2.0 (default: 0.6)", "TEMP")]
    pub temperature: Option<String>,

    /// Alternate API endpoint.
    #[arrrg(optional, "API base URL (default: Google's v1beta endpoint)", "URL")]
    pub base_url: Option<String>,

    /// Disable grounding with Google Search.
    #[arrrg(flag, "Disable the Google Search tool")]
    pub no_search: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    /// The model to use for generating replies.
    pub model: Model,

    /// Static generation settings sent with every request.
    pub generation: GenerationConfig,

    /// Alternate API endpoint, if any.
    pub base_url: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl BotConfig {
    /// Creates a new BotConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.5-flash
    /// - Temperature: 0.6
    /// - Max output tokens: 65535
    /// - Tools: Google Search
    /// - System instruction: the travel planner persona
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            generation: GenerationConfig::new()
                .with_tool(Tool::google_search())
                .with_system_instruction(DEFAULT_SYSTEM_INSTRUCTION),
            base_url: None,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.generation.system_instruction = Some(instruction.into());
        self
    }

    /// Sets the maximum output tokens.
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.generation.max_output_tokens = max_output_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.generation.temperature = temperature;
        self
    }

    /// Removes all tools.
    pub fn without_tools(mut self) -> Self {
        self.generation.tools.clear();
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// True if the Google Search tool is enabled.
    pub fn search_enabled(&self) -> bool {
        self.generation
            .tools
            .iter()
            .any(|tool| matches!(tool, Tool::GoogleSearch(_)))
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<TravelArgs> for BotConfig {
    type Error = Error;

    fn try_from(args: TravelArgs) -> Result<Self> {
        let mut config = BotConfig::new();
        if let Some(model) = args.model {
            config = config.with_model(Model::from(model.as_str()));
        }
        if let Some(system) = args.system {
            config = config.with_system_instruction(system);
        }
        let max_tokens = args.max_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);
        if max_tokens == 0 {
            return Err(Error::validation(
                "max tokens must be positive",
                Some("max-tokens".to_string()),
            ));
        }
        config = config.with_max_output_tokens(max_tokens);
        let temperature = match args.temperature {
            Some(value) => parse_temperature(&value)?,
            None => DEFAULT_TEMPERATURE,
        };
        config = config.with_temperature(temperature);
        if let Some(base_url) = args.base_url {
            config = config.with_base_url(base_url);
        }
        if args.no_search {
            config = config.without_tools();
        }
        if args.no_color {
            config = config.without_color();
        }
        Ok(config)
    }
}

fn parse_temperature(value: &str) -> Result<f64> {
    let invalid = || {
        Error::validation(
            format!("temperature must be a number between 0.0 and {MAX_TEMPERATURE:.1}, got {value:?}"),
            Some("temperature".to_string()),
        )
    };
    let temperature = value.trim().parse::<f64>().map_err(|_| invalid())?;
    if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(invalid());
    }
    Ok(temperature)
}
