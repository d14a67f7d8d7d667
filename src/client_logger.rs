//! Logging hook for agora client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! the replies passing through the [`AgoraClient`](crate::AgoraClient).

use crate::{Message, StreamChunk};

/// A trait for logging chat replies received by the client.
///
/// # Example
///
/// ```rust,ignore
/// use agora::{ClientLogger, Message, StreamChunk};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_message(&self, message: &Message) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "reply: {}", serde_json::to_string(message).unwrap()).unwrap();
///     }
///
///     fn log_stream_chunk(&self, chunk: &StreamChunk) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "chunk: {}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
///
///     fn log_stream_message(&self, message: &Message) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "streamed: {}", serde_json::to_string(message).unwrap()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log the assistant message built from a non-streaming `send_message` call.
    fn log_message(&self, message: &Message);

    /// Log an individual chunk received during `stream_chat`.
    fn log_stream_chunk(&self, chunk: &StreamChunk);

    /// Log the message reduced from a completed stream.
    fn log_stream_message(&self, message: &Message);
}
