use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::GenerateContentResponse;

/// One unit of a streamed reply.
///
/// Streams interleave answer text with objects that carry no text at all:
/// usage accounting, grounding metadata, tool calls and the occasional payload
/// that does not match the documented shape.  Consumers match on the variant
/// instead of probing the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A piece of answer text, possibly empty.
    TextDelta(String),

    /// Anything else, kept raw for logging.
    Other(Value),
}

impl StreamChunk {
    /// Classify one decoded `data:` payload.
    ///
    /// A payload with a top-level `error` object is an in-band failure of the
    /// call and is returned as an [`Error::Api`].
    pub fn from_value(value: Value) -> Result<Self> {
        if let Some(error) = value.get("error") {
            return Err(in_band_error(error));
        }
        match serde_json::from_value::<GenerateContentResponse>(value.clone()) {
            Ok(response) => match response.text() {
                Some(text) => Ok(StreamChunk::TextDelta(text)),
                None => Ok(StreamChunk::Other(value)),
            },
            Err(_) => Ok(StreamChunk::Other(value)),
        }
    }

    /// Classify one raw `data:` payload that may not even be JSON.
    pub fn from_data(data: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(data) {
            Ok(value) => Self::from_value(value),
            Err(_) => Ok(StreamChunk::Other(Value::String(data.to_string()))),
        }
    }

    /// The text of a `TextDelta`, if this is one.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamChunk::TextDelta(text) => Some(text),
            StreamChunk::Other(_) => None,
        }
    }
}

fn in_band_error(error: &Value) -> Error {
    let status_code = error
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(500);
    let status = error
        .get("status")
        .and_then(Value::as_str)
        .map(String::from);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error in stream");
    Error::api(status_code, status, message)
}
