// Public modules
pub mod client;
pub mod commands;
pub mod config;
pub mod consumer;
pub mod credential;
pub mod error;
pub mod render;
pub mod request;
pub mod session;
pub mod sse;
pub mod transcript;
pub mod types;

mod observability;

// Re-exports
pub use client::{ChunkStream, ContentGenerator, Gemini};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{BotConfig, DEFAULT_SYSTEM_INSTRUCTION, TravelArgs};
pub use consumer::consume_stream;
pub use credential::{API_KEY_ENV, ApiKey, CredentialResolver, MaskedPrompt, NoPrompt, SecretPrompt};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{CURSOR, PlainTextRenderer, Renderer, render_transcript};
pub use request::{build_contents, build_request};
pub use session::{ChatSession, SessionStats};
pub use transcript::{DisplayRole, Message, Role, Transcript};
pub use types::*;
