pub mod services;

use bytes::Bytes;

pub use services::ImageAssets;

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}
