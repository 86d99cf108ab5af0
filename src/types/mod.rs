// Public modules
pub mod content;
pub mod generate_content_request;
pub mod generate_content_response;
pub mod generation_config;
pub mod model;
pub mod stream_chunk;
pub mod tool;

// Re-exports
pub use content::{Content, ContentRole, Part};
pub use generate_content_request::GenerateContentRequest;
pub use generate_content_response::{Candidate, GenerateContentResponse, UsageMetadata};
pub use generation_config::{
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, GenerationConfig, GenerationParams,
};
pub use model::{KnownModel, Model};
pub use stream_chunk::StreamChunk;
pub use tool::{GoogleSearch, Tool};
