// Public modules
pub mod accumulating_stream;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod config;
pub mod error;
pub mod markdown;
pub mod observability;
pub mod reducer;
pub mod render;
pub mod results;
pub mod sse;
pub mod types;
pub mod utils;

// Re-exports
pub use accumulating_stream::{AccumulatedMessage, AccumulatingStream};
pub use client::{AgoraClient, ChunkStream};
pub use client_logger::ClientLogger;
pub use config::ApiConfig;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use reducer::{StreamReducer, reduce_stream};
pub use results::{ResultsPanel, ResultsTab};
pub use types::*;
