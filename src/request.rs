//! Turning a transcript into a generation request.
//!
//! The request's content list is derived from the transcript alone: one
//! [`Content`] per message, in order, with the message text as its only part.
//! The whole history is sent on every turn.

use crate::transcript::Message;
use crate::types::{Content, GenerateContentRequest, GenerationConfig};

/// Map transcript messages onto API contents, preserving order.
pub fn build_contents(messages: &[Message]) -> Vec<Content> {
    messages
        .iter()
        .map(|message| Content::new_with_text(message.content.clone(), message.role.into()))
        .collect()
}

/// Build the full request for the next turn.
pub fn build_request(messages: &[Message], config: &GenerationConfig) -> GenerateContentRequest {
    GenerateContentRequest::new(build_contents(messages), config)
}
