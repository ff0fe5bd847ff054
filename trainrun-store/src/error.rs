//! Error types for the trainrun object store

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur when uploading artifacts
#[derive(Debug, Error)]
pub enum StoreError {
    /// Local file could not be read or listed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The selection pattern built from the folder and suffix is not valid
    #[error("Invalid file pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The remote store rejected or failed the upload
    #[error("Upload of {key} to bucket {bucket} failed: {message}")]
    UploadFailed {
        bucket: String,
        key: String,
        message: String,
    },
}

impl StoreError {
    /// Create an upload error for a bucket/key pair
    pub fn upload_failed(
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UploadFailed {
            bucket: bucket.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}
