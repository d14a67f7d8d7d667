use serde::{Deserialize, Serialize};

/// Response of `POST /api/upload-image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUploadResponse {
    /// Name the service stored the file under.
    pub filename: String,

    /// Path to pass as `image_url` with the next chat message.
    pub image_url: String,
}
