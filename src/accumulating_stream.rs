//! Accumulates stream chunks into a complete message while passing chunks through.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;

use crate::{ClientLogger, Error, Message, StreamChunk, StreamReducer};

/// What the receiver of an [`AccumulatingStream`] gets once the stream is drained.
pub type AccumulatedMessage = Result<Option<Message>, Error>;

/// A stream wrapper that reduces [`StreamChunk`]s into a [`Message`].
///
/// This allows rendering every chunk as it arrives while the reply is being
/// built.  When the stream is fully drained, the reduced message (or the
/// stream's error) is sent via the oneshot channel returned by `new()`.
pub struct AccumulatingStream {
    inner: Pin<Box<dyn Stream<Item = Result<StreamChunk, Error>> + Send>>,
    message_tx: Option<tokio::sync::oneshot::Sender<AccumulatedMessage>>,
    reducer: StreamReducer,
    error: Option<Error>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl AccumulatingStream {
    /// Wraps a chunk stream for a reply in `session_id`.
    ///
    /// Returns the stream and a receiver that will contain the reduced message
    /// once the stream is fully drained.
    pub fn new<S>(
        stream: S,
        session_id: impl Into<String>,
    ) -> (Self, tokio::sync::oneshot::Receiver<AccumulatedMessage>)
    where
        S: Stream<Item = Result<StreamChunk, Error>> + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let this = Self {
            inner: Box::pin(stream),
            message_tx: Some(tx),
            reducer: StreamReducer::new(session_id),
            error: None,
            logger: None,
        };
        (this, rx)
    }

    /// Reports every chunk and the reduced message to `logger`.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The message reduced so far.
    pub fn message(&self) -> Option<&Message> {
        self.reducer.message()
    }

    fn finalize(&mut self) -> AccumulatedMessage {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        let message = self.reducer.message().cloned();
        if let (Some(logger), Some(message)) = (&self.logger, &message) {
            logger.log_stream_message(message);
        }
        Ok(message)
    }
}

impl Stream for AccumulatingStream {
    type Item = Result<StreamChunk, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(logger) = &self.logger {
                    logger.log_stream_chunk(&chunk);
                }
                self.reducer.apply(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                if self.error.is_none() {
                    self.error = Some(e.clone());
                }
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                if let Some(tx) = self.message_tx.take() {
                    let result = self.finalize();
                    let _ = tx.send(result);
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageMetadata, MessageRole};
    use futures::{StreamExt, stream};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLogger {
        chunks: Mutex<Vec<StreamChunk>>,
        messages: Mutex<Vec<Message>>,
    }

    impl ClientLogger for RecordingLogger {
        fn log_message(&self, message: &Message) {
            self.messages.lock().unwrap().push(message.clone());
        }

        fn log_stream_chunk(&self, chunk: &StreamChunk) {
            self.chunks.lock().unwrap().push(chunk.clone());
        }

        fn log_stream_message(&self, message: &Message) {
            self.messages.lock().unwrap().push(message.clone());
        }
    }

    #[tokio::test]
    async fn chunks_pass_through_and_message_is_reported() {
        let chunks = vec![
            Ok(StreamChunk::content("question").with_role(MessageRole::User)),
            Ok(StreamChunk::content("Hi")),
            Ok(StreamChunk::content("Hi there")),
            Ok(StreamChunk::final_chunk(MessageMetadata::default())),
        ];
        let (acc, rx) = AccumulatingStream::new(stream::iter(chunks), "session-1");
        let seen: Vec<_> = acc.collect().await;
        assert_eq!(seen.len(), 4);

        let message = rx.await.expect("channel closed").unwrap().unwrap();
        assert_eq!(message.content, "Hi there");
        assert_eq!(message.session_id.as_deref(), Some("session-1"));
    }

    #[tokio::test]
    async fn stream_error_is_reported() {
        let chunks = vec![
            Ok(StreamChunk::content("Hi")),
            Err(Error::streaming("connection reset", None)),
        ];
        let (acc, rx) = AccumulatingStream::new(stream::iter(chunks), "s");
        let seen: Vec<_> = acc.collect().await;
        assert!(seen[1].is_err());

        let err = rx.await.expect("channel closed").unwrap_err();
        assert!(err.is_streaming());
    }

    #[tokio::test]
    async fn empty_stream_reports_no_message() {
        let chunks: Vec<Result<StreamChunk, Error>> = vec![];
        let (mut acc, rx) = AccumulatingStream::new(stream::iter(chunks), "s");
        while acc.next().await.is_some() {}
        assert!(rx.await.expect("channel closed").unwrap().is_none());
    }

    #[tokio::test]
    async fn logger_sees_chunks_and_message() {
        let logger = Arc::new(RecordingLogger::default());
        let chunks = vec![Ok(StreamChunk::content("a")), Ok(StreamChunk::content("ab"))];
        let (acc, rx) = AccumulatingStream::new(stream::iter(chunks), "s");
        let acc = acc.with_logger(logger.clone());
        let _: Vec<_> = acc.collect().await;
        rx.await.expect("channel closed").unwrap();

        assert_eq!(logger.chunks.lock().unwrap().len(), 2);
        let messages = logger.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "ab");
    }
}
