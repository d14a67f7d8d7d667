// Public modules
pub mod chat_request;
pub mod chat_response;
pub mod code_block;
pub mod image_analysis;
pub mod image_upload;
pub mod message;
pub mod metadata;
pub mod search_result;
pub mod session;
pub mod stream_chunk;
pub mod usage;

// Re-exports
pub use chat_request::ChatRequest;
pub use chat_response::{ChatResponse, ChatResult};
pub use code_block::{CodeBlock, CodeResult};
pub use image_analysis::{ImageAnalysis, ImageAnalysisResult, ImageDetection};
pub use image_upload::ImageUploadResponse;
pub use message::{Message, MessageRole, STREAM_ERROR_TEXT, local_message_id};
pub use metadata::MessageMetadata;
pub use search_result::{SEARCH_SUMMARY_TITLE, SearchResult, SearchSummary};
pub use session::{NewSessionRequest, Session};
pub use stream_chunk::{ChunkType, StreamChunk};
pub use usage::Usage;
