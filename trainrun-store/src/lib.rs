//! Trainrun Object Store
//!
//! Uploads checkpoint artifacts produced by training jobs to an
//! S3-compatible bucket.
//!
//! The crate is split in two:
//! - [`ObjectStore`]: the capability of putting one local file under a key
//! - [`ArtifactUploader`]: which files to send and under which keys
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use trainrun_store::{ArtifactUploader, KeyPrefix, S3Settings, S3Store};
//!
//! #[tokio::main]
//! async fn main() -> trainrun_store::Result<()> {
//!     let store = S3Store::connect(&S3Settings::default()).await;
//!     let uploader = ArtifactUploader::new(Arc::new(store), KeyPrefix::new("user-1", "job-7"));
//!
//!     let report = uploader
//!         .upload_folder(Path::new("output/my_lora"), "checkpoints", ".safetensors")
//!         .await?;
//!
//!     println!("Uploaded {} file(s)", report.keys.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod s3;
mod uploader;

// Re-export commonly used types
pub use error::{Result, StoreError};
pub use s3::{S3Settings, S3Store};
pub use uploader::{
    ArtifactUploader, CHECKPOINT_SUBPATH, DEFAULT_CHECKPOINT_SUFFIX, KeyPrefix, UploadReport,
    matching_files,
};

use async_trait::async_trait;
use std::path::Path;

/// Capability of storing a local file in a remote bucket
///
/// Implemented by [`S3Store`]; tests substitute an in-memory fake.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `path` to `bucket` under `key`
    ///
    /// # Arguments
    /// * `path` - Local file to upload
    /// * `bucket` - Destination bucket name
    /// * `key` - Destination object key
    async fn put_file(&self, path: &Path, bucket: &str, key: &str) -> Result<()>;
}
