//! Consuming a streamed reply.
//!
//! [`consume_stream`] drains a chunk stream into one string while keeping the
//! display in step with it.  Non-text chunks are skipped; the first error ends
//! the reply.

use futures::{Stream, StreamExt};

use crate::error::Result;
use crate::observability::{STREAM_SKIPPED_CHUNKS, STREAM_TEXT_DELTAS};
use crate::render::{CURSOR, Renderer};
use crate::types::StreamChunk;

/// Drain `stream`, live-updating `renderer`, and return the full reply text.
///
/// Every non-empty text delta is appended and the reply so far is redrawn with
/// a trailing [`CURSOR`].  When the stream ends, the reply is drawn once more
/// without the cursor.  An `Err` item is returned as-is; whatever was drawn
/// stays on screen and the final redraw does not happen.
///
/// # Examples
///
/// ```
/// # use futures::stream;
/// # use travelbot::{consume_stream, DisplayRole, Renderer, StreamChunk};
/// # struct Quiet;
/// # impl Renderer for Quiet {
/// #     fn print_message(&mut self, _: DisplayRole, _: &str) {}
/// #     fn update_response(&mut self, _: &str) {}
/// #     fn finish_response(&mut self, _: &str) {}
/// #     fn print_error(&mut self, _: &str) {}
/// #     fn print_info(&mut self, _: &str) {}
/// # }
/// # tokio_test::block_on(async {
/// let chunks = stream::iter(vec![
///     Ok(StreamChunk::TextDelta("嘉義".to_string())),
///     Ok(StreamChunk::Other(serde_json::json!({"usageMetadata": {}}))),
///     Ok(StreamChunk::TextDelta("三日遊".to_string())),
/// ]);
/// let reply = consume_stream(chunks, &mut Quiet).await.unwrap();
/// assert_eq!(reply, "嘉義三日遊");
/// # });
/// ```
pub async fn consume_stream<S>(stream: S, renderer: &mut dyn Renderer) -> Result<String>
where
    S: Stream<Item = Result<StreamChunk>>,
{
    futures::pin_mut!(stream);

    let mut accumulated = String::new();
    renderer.start_response();

    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::TextDelta(text) if text.is_empty() => {}
            StreamChunk::TextDelta(text) => {
                STREAM_TEXT_DELTAS.click();
                accumulated.push_str(&text);
                renderer.update_response(&format!("{accumulated}{CURSOR}"));
            }
            StreamChunk::Other(raw) => {
                STREAM_SKIPPED_CHUNKS.click();
                tracing::debug!(chunk = %raw, "skipping chunk without text");
            }
        }
    }

    renderer.finish_response(&accumulated);
    Ok(accumulated)
}
