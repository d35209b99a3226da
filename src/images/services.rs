use std::sync::Arc;

use tracing::{debug, warn};

use super::ImageUpload;
use crate::config::UploadConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::storage::StorageClient;
use crate::validation::{self, ALLOWED_IMAGE_EXTENSIONS};

/// Validates, stores and removes event images.
///
/// Stored images are referenced by `<url_prefix>/<generated-name>.<ext>`,
/// which is also the path they are served under.
#[derive(Clone)]
pub struct ImageAssets {
    storage: Arc<dyn StorageClient>,
    url_prefix: String,
    max_bytes: u64,
}

impl ImageAssets {
    pub fn new(storage: Arc<dyn StorageClient>, config: &UploadConfig) -> Self {
        Self {
            storage,
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            max_bytes: config.max_bytes,
        }
    }

    /// Stores the upload under a fresh name and returns its reference path.
    ///
    /// Rule violations are `Validation`; write failures are `Asset`.
    pub async fn store(&self, upload: &ImageUpload) -> ServiceResult<String> {
        if !validation::is_valid_image(Some(upload), self.max_bytes) {
            return Err(ServiceError::validation(format!(
                "Image must be a non-empty {} file of at most {} bytes.",
                ALLOWED_IMAGE_EXTENSIONS.join("/"),
                self.max_bytes
            )));
        }

        let file_name = validation::unique_file_name(&upload.file_name);
        if let Err(e) = self.storage.put_object(&file_name, upload.body.clone()).await {
            warn!(error = %e, file = %file_name, "image write failed");
            return Err(ServiceError::Asset("Image could not be stored.".into()));
        }

        debug!(
            file = %file_name,
            bytes = upload.body.len(),
            content_type = upload.content_type.as_deref().unwrap_or("-"),
            "image stored"
        );
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }

    /// Best-effort removal. Failures are logged and never returned.
    pub async fn delete(&self, reference: &str) {
        let Some(key) = object_key(reference) else {
            return;
        };
        match self.storage.delete_object(key).await {
            Ok(()) => debug!(file = %key, "image deleted"),
            Err(e) => warn!(error = %e, file = %key, "image delete failed"),
        }
    }
}

/// Only the final path segment is honoured, so a reference can never point
/// outside the upload directory.
fn object_key(reference: &str) -> Option<&str> {
    let key = reference.rsplit(['/', '\\']).next()?;
    match key {
        "" | "." | ".." => None,
        k => Some(k),
    }
}
