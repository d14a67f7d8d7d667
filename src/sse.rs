//! Server-Sent Events (SSE) processing for streaming chat responses.
//!
//! This module turns the raw byte stream of `/api/chat/stream` into a stream
//! of [`StreamChunk`] values.  Events are separated by a blank line and carry
//! their JSON payload after a `data: ` prefix.  An event whose payload does
//! not parse is logged and skipped; the stream carries on with the next one.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS, STREAM_SKIPPED_EVENTS};
use crate::{Error, Result, StreamChunk};

/// Prefix of the payload line of an event.
pub const DATA_PREFIX: &str = "data: ";

struct SseState<S> {
    stream: S,
    buffer: Vec<u8>,
    done: bool,
}

/// Process a stream of bytes into a stream of parsed chunks.
///
/// Bytes are buffered until a complete event is available, so events and
/// multi-byte characters may be split arbitrarily across reads.  A transport
/// error is yielded once and ends the stream.  A trailing partial event left
/// when the byte stream ends is discarded.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<StreamChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = SseState {
        stream: byte_stream,
        buffer: Vec::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            // First drain any complete event already in the buffer
            if let Some(event) = take_event(&mut state.buffer) {
                match parse_event(&event) {
                    Some(chunk) => return Some((Ok(chunk), state)),
                    None => continue,
                }
            }
            if state.done {
                return None;
            }

            // Read more data
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => {
                    STREAM_ERRORS.click();
                    state.done = true;
                    state.buffer.clear();
                    let err =
                        Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)));
                    return Some((Err(err), state));
                }
                None => {
                    if !state.buffer.iter().all(u8::is_ascii_whitespace) {
                        tracing::debug!(
                            bytes = state.buffer.len(),
                            "discarding incomplete event at end of stream"
                        );
                    }
                    return None;
                }
            }
        }
    })
}

/// Remove the first complete event from `buffer`, delimiter included.
fn take_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let (end, delimiter_len) = find_boundary(buffer)?;
    let event: Vec<u8> = buffer.drain(..end).collect();
    buffer.drain(..delimiter_len);
    Some(event)
}

/// Find the earliest blank-line delimiter, `\n\n` or `\r\n\r\n`.
fn find_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buffer, b"\n\n").map(|at| (at, 2));
    let crlf = find(buffer, b"\r\n\r\n").map(|at| (at, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse one event.  Returns `None` for events that carry no chunk.
fn parse_event(raw: &[u8]) -> Option<StreamChunk> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            STREAM_SKIPPED_EVENTS.click();
            tracing::warn!(error = %e, "skipping SSE event with invalid UTF-8");
            return None;
        }
    };
    let Some(payload) = data_payload(text) else {
        tracing::trace!(event = text, "ignoring SSE event without data");
        return None;
    };
    match serde_json::from_str::<StreamChunk>(&payload) {
        Ok(chunk) => {
            STREAM_EVENTS.click();
            Some(chunk)
        }
        Err(e) => {
            STREAM_SKIPPED_EVENTS.click();
            tracing::warn!(error = %e, payload = %payload, "failed to parse SSE data");
            None
        }
    }
}

/// Extract the payload of an event that starts with the `data: ` prefix.
///
/// Multiple data lines are joined with newlines.
fn data_payload(event: &str) -> Option<String> {
    if !event.starts_with(DATA_PREFIX) {
        return None;
    }
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .collect();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChunkType, MessageRole};
    use futures::stream;
    use std::io;

    fn byte_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<Bytes, io::Error>> + Unpin {
        stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from_static(chunk)))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(chunks: Vec<&'static [u8]>) -> Vec<Result<StreamChunk>> {
        process_sse(byte_stream(chunks)).collect().await
    }

    #[tokio::test]
    async fn parse_content_event() {
        let events = collect(vec![b"data: {\"type\":\"content\",\"content\":\"Hi\"}\n\n"]).await;
        assert_eq!(events.len(), 1);
        let chunk = events[0].as_ref().unwrap();
        assert_eq!(chunk.r#type, ChunkType::Content);
        assert_eq!(chunk.content.as_deref(), Some("Hi"));
    }

    #[tokio::test]
    async fn parse_multiple_events() {
        let events = collect(vec![
            b"data: {\"type\":\"content\",\"role\":\"user\",\"content\":\"q\"}\n\ndata: {\"type\":\"content\",\"role\":\"model\",\"content\":\"a\"}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap().role,
            Some(MessageRole::User)
        );
        assert_eq!(
            events[1].as_ref().unwrap().role,
            Some(MessageRole::Model)
        );
    }

    #[tokio::test]
    async fn handle_split_event() {
        let events = collect(vec![
            b"data: {\"type\":\"con",
            b"tent\",\"content\":\"split\"}\n",
            b"\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().content.as_deref(), Some("split"));
    }

    #[tokio::test]
    async fn handle_split_utf8_character() {
        // "é" is 0xC3 0xA9.
        let events = collect(vec![
            b"data: {\"type\":\"content\",\"content\":\"caf\xC3",
            b"\xA9\"}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().content.as_deref(), Some("café"));
    }

    #[tokio::test]
    async fn malformed_json_is_skipped() {
        let events = collect(vec![
            b"data: {\"type\":\"content\",\"content\":\"one\"}\n\n",
            b"data: {not json}\n\n",
            b"data: {\"type\":\"content\",\"content\":\"two\"}\n\n",
        ])
        .await;
        let contents: Vec<_> = events
            .iter()
            .map(|e| e.as_ref().unwrap().content.clone().unwrap())
            .collect();
        assert_eq!(contents, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_skipped() {
        let events = collect(vec![
            b"data: {\"type\":\"content\",\"content\":\"\xFF\"}\n\n",
            b"data: {\"type\":\"final\"}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().r#type, ChunkType::Final);
    }

    #[tokio::test]
    async fn events_without_data_are_ignored() {
        let events = collect(vec![
            b": keep-alive\n\n",
            b"event: ping\n\n",
            b"data: {\"type\":\"final\"}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().r#type, ChunkType::Final);
    }

    #[tokio::test]
    async fn crlf_delimiters() {
        let events = collect(vec![
            b"data: {\"type\":\"content\",\"content\":\"a\"}\r\n\r\ndata: {\"type\":\"content\",\"content\":\"b\"}\r\n\r\n",
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].as_ref().unwrap().content.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn multiline_data_is_joined() {
        let events = collect(vec![
            b"data: {\"type\":\"content\",\ndata: \"content\":\"joined\"}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().content.as_deref(), Some("joined"));
    }

    #[tokio::test]
    async fn trailing_partial_event_is_discarded() {
        let events = collect(vec![
            b"data: {\"type\":\"content\",\"content\":\"whole\"}\n\n",
            b"data: {\"type\":\"content\",\"content\":\"partial\"}",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().content.as_deref(), Some("whole"));
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let chunks: Vec<std::result::Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"content\",\"content\":\"a\"}\n\n")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"data: {\"type\":\"content\",\"content\":\"b\"}\n\n")),
        ];
        let events: Vec<_> = process_sse(stream::iter(chunks)).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        let err = events[1].as_ref().unwrap_err();
        assert!(err.is_streaming());
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn boundary_prefers_earliest_delimiter() {
        assert_eq!(find_boundary(b"a\r\n\r\nb\n\n"), Some((1, 4)));
        assert_eq!(find_boundary(b"a\n\nb\r\n\r\n"), Some((1, 2)));
        assert_eq!(find_boundary(b"a\nb"), None);
    }

    #[test]
    fn data_payload_requires_prefix() {
        assert_eq!(data_payload("data: {}"), Some("{}".to_string()));
        assert_eq!(data_payload("data:{}"), None);
        assert_eq!(data_payload("event: x\ndata: {}"), None);
    }
}
