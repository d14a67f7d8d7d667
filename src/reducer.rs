//! Folds stream chunks into one growing assistant message.
//!
//! Every `content` chunk carries the full text produced so far, so content is
//! replaced rather than appended; a chunk with empty content is skipped.  The
//! `final` chunk carries the authoritative results and replaces whatever
//! metadata arrived before it, leaving it empty when it carries none.

use std::time::Instant;

use futures::{Stream, StreamExt};

use crate::observability::STREAM_DURATION;
use crate::{ChunkType, Message, Result, StreamChunk};

/// Accumulates the assistant's reply from stream chunks.
#[derive(Debug, Clone)]
pub struct StreamReducer {
    session_id: String,
    message: Option<Message>,
    saw_content: bool,
}

impl StreamReducer {
    /// Creates a reducer for a reply in `session_id`.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: None,
            saw_content: false,
        }
    }

    /// Applies one chunk.  Returns true when the message changed.
    pub fn apply(&mut self, chunk: &StreamChunk) -> bool {
        if chunk.is_user_echo() {
            return false;
        }
        match chunk.r#type {
            ChunkType::Content => self.apply_content(chunk),
            ChunkType::Final => self.apply_final(chunk),
            ChunkType::Unknown => false,
        }
    }

    fn apply_content(&mut self, chunk: &StreamChunk) -> bool {
        let Some(content) = chunk.content.as_ref().filter(|c| !c.is_empty()) else {
            return false;
        };
        let message = self.message_mut();
        message.content.clone_from(content);
        if let Some(results) = chunk.results() {
            message.metadata = Some(results);
        }
        if chunk.timestamp.is_some() {
            message.timestamp.clone_from(&chunk.timestamp);
        }
        self.saw_content = true;
        true
    }

    fn apply_final(&mut self, chunk: &StreamChunk) -> bool {
        let results = chunk.results();
        let content = chunk.content.as_ref().filter(|_| !self.saw_content);
        if self.message.is_none()
            && content.is_none()
            && !results.as_ref().is_some_and(|r| r.has_results())
        {
            return false;
        }
        let content = content.cloned();
        let message = self.message_mut();
        if let Some(content) = content {
            message.content = content;
        }
        message.metadata = Some(results.unwrap_or_default());
        if chunk.timestamp.is_some() {
            message.timestamp.clone_from(&chunk.timestamp);
        }
        true
    }

    fn message_mut(&mut self) -> &mut Message {
        let session_id = &self.session_id;
        self.message
            .get_or_insert_with(|| Message::assistant(String::new(), session_id.as_str()))
    }

    /// The message accumulated so far, if any chunk produced one.
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// The session this reply belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Consumes the reducer, returning the accumulated message.
    pub fn finish(self) -> Option<Message> {
        self.message
    }
}

/// Drains `stream` through `reducer`, calling `on_update` whenever the
/// message changes.
///
/// The first stream error aborts the reduction and is returned; the caller
/// decides what to show in place of the partial reply.
pub async fn reduce_stream<S, F>(
    stream: S,
    mut reducer: StreamReducer,
    mut on_update: F,
) -> Result<Option<Message>>
where
    S: Stream<Item = Result<StreamChunk>>,
    F: FnMut(&Message),
{
    let start = Instant::now();
    let mut stream = std::pin::pin!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                STREAM_DURATION.add(start.elapsed().as_secs_f64());
                return Err(err);
            }
        };
        if reducer.apply(&chunk)
            && let Some(message) = reducer.message()
        {
            on_update(message);
        }
    }
    STREAM_DURATION.add(start.elapsed().as_secs_f64());
    Ok(reducer.finish())
}
