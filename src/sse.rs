//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! `streamGenerateContent?alt=sse` answers with data-only events, one JSON
//! response object per event:
//!
//! ```text
//! data: {"candidates":[{"content":{"parts":[{"text":"嘉義"}],"role":"model"}}]}
//!
//! data: {"candidates":[{"content":{"parts":[{"text":"三日遊"}],"role":"model"}}]}
//! ```
//!
//! This module turns the raw byte stream into a stream of [`StreamChunk`]s.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::{Error, Result, StreamChunk};

/// Process a stream of bytes into a stream of classified chunks.
///
/// Transport errors and invalid UTF-8 are yielded as `Err` and end the stream.
/// Payloads that are not recognizable responses are yielded as
/// [`StreamChunk::Other`].
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamChunk>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let state = SseState {
        stream,
        buffer: String::new(),
        consumed: 0,
        pending: Vec::new(),
        finished: false,
    };

    stream::unfold(state, move |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            // First check if we have a complete event in the buffer
            if let Some(event) = state.next_event() {
                match event {
                    SseEvent::Empty => continue,
                    SseEvent::Done => return None,
                    SseEvent::Data(data) => {
                        STREAM_EVENTS.click();
                        return Some((StreamChunk::from_data(&data), state));
                    }
                }
            }

            // Read more data
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    if let Err(e) = state.push_bytes(&bytes) {
                        STREAM_ERRORS.click();
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
                Some(Err(e)) => {
                    STREAM_ERRORS.click();
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    // End of stream; the last event may lack its blank line.
                    state.finished = true;
                    return match parse_event(state.remaining()) {
                        SseEvent::Data(data) => {
                            STREAM_EVENTS.click();
                            Some((StreamChunk::from_data(&data), state))
                        }
                        SseEvent::Empty | SseEvent::Done => None,
                    };
                }
            }
        }
    })
}

struct SseState<S> {
    stream: S,
    /// Decoded text with every line break normalized to `\n`.
    buffer: String,
    /// Bytes of `buffer` already handed out as events.
    consumed: usize,
    /// Undecoded tail: part of a multi-byte character or a trailing `\r`.
    pending: Vec<u8>,
    finished: bool,
}

impl<S> SseState<S> {
    /// Append bytes, holding back a multi-byte character split across reads.
    fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.drain(..self.consumed);
        self.consumed = 0;

        self.pending.extend_from_slice(bytes);
        let mut valid = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                return Err(Error::encoding(
                    format!("Invalid UTF-8 in stream: {e}"),
                    Some(Box::new(e)),
                ));
            }
        };
        // A `\r` at the end may be the first half of a `\r\n`.
        if valid > 0 && self.pending[valid - 1] == b'\r' {
            valid -= 1;
        }
        let rest = self.pending.split_off(valid);
        let text = std::str::from_utf8(&self.pending)?;
        if text.contains('\r') {
            self.buffer
                .push_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
        } else {
            self.buffer.push_str(text);
        }
        self.pending = rest;
        Ok(())
    }

    /// Take the next complete event, if the buffer holds one.
    fn next_event(&mut self) -> Option<SseEvent> {
        let unread = &self.buffer[self.consumed..];
        let end = unread.find("\n\n")?;
        let event = parse_event(&unread[..end]);
        self.consumed += end + 2;
        Some(event)
    }

    /// Whatever is left once the byte stream has ended.
    fn remaining(&self) -> &str {
        &self.buffer[self.consumed..]
    }
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Data(String),
    Done,
    Empty,
}

/// Join the `data:` lines of one event; other fields and comments are ignored.
fn parse_event(event_text: &str) -> SseEvent {
    let data_lines: Vec<&str> = event_text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if data_lines.is_empty() {
        return SseEvent::Empty;
    }
    let data = data_lines.join("\n");
    match data.trim() {
        "" => SseEvent::Empty,
        "[DONE]" => SseEvent::Done,
        _ => SseEvent::Data(data),
    }
}
