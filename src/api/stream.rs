// src/api/stream.rs
// Line-delimited chat event stream decoding with proper buffering

use std::pin::Pin;

use futures::stream::unfold;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use crate::types::ChatStreamEvent;

/// Stream of decoded chat events for one reply
pub type ChatEventStream = Pin<Box<dyn Stream<Item = ApiResult<ChatStreamEvent>> + Send>>;

const DATA_PREFIX: &str = "data: ";

/// Byte buffer that hands out complete lines only.
///
/// Bytes are kept raw until a newline arrives, so a chunk boundary inside a
/// multi-byte character never corrupts the text.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator (`\n` or `\r\n`)
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Bytes still waiting for a newline
    pub fn remainder(&self) -> &[u8] {
        &self.buf
    }
}

/// Decode one line. `None` for lines that carry no event (blank
/// separators, comments, other SSE fields).
pub fn parse_event_line(line: &str) -> Option<ApiResult<ChatStreamEvent>> {
    let data = line.strip_prefix(DATA_PREFIX)?;
    Some(serde_json::from_str(data).map_err(ApiError::from))
}

struct DecoderState<S> {
    source: Option<Pin<Box<S>>>,
    lines: LineBuffer,
    events: usize,
}

impl<S> DecoderState<S> {
    /// Drop the body so no more bytes are read
    fn close(&mut self) {
        self.source = None;
    }
}

/// Turn a chunked byte stream into chat events.
///
/// Each complete `data: ` line is decoded and yielded as soon as it is
/// seen. The stream ends right after `done`, on the first error, or when
/// the body ends. An unterminated trailing line is discarded.
pub fn chat_event_stream<S, B, E>(bytes: S) -> impl Stream<Item = ApiResult<ChatStreamEvent>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Into<ApiError>,
{
    let initial_state = DecoderState {
        source: Some(Box::pin(bytes)),
        lines: LineBuffer::new(),
        events: 0,
    };

    unfold(initial_state, |mut state| async move {
        loop {
            if state.source.is_none() {
                return None;
            }

            // Drain every complete line before reading more
            while let Some(line) = state.lines.next_line() {
                match parse_event_line(&line) {
                    None => continue,
                    Some(Ok(event)) => {
                        state.events += 1;
                        debug!(n = state.events, ?event, "Chat stream event");
                        if event.is_terminal() {
                            state.close();
                        }
                        return Some((Ok(event), state));
                    }
                    Some(Err(e)) => {
                        warn!("Failed to decode chat event line: {}", e);
                        state.close();
                        return Some((Err(e), state));
                    }
                }
            }

            let source = state.source.as_mut()?;
            match source.next().await {
                Some(Ok(chunk)) => state.lines.push(chunk.as_ref()),
                Some(Err(e)) => {
                    state.close();
                    return Some((Err(e.into()), state));
                }
                None => {
                    let rest = state.lines.remainder();
                    if !rest.is_empty() {
                        warn!(
                            "Chat stream ended with unterminated data: {:?}",
                            String::from_utf8_lossy(rest)
                        );
                    }
                    debug!(events = state.events, "Chat stream ended without done");
                    return None;
                }
            }
        }
    })
}
