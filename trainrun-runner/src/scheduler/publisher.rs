//! Checkpoint publishing
//!
//! After a job completes, its checkpoint folder is uploaded to the bucket
//! and the scratch folder is emptied for the next job.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use trainrun_core::domain::job::JobConfig;
use trainrun_store::{ArtifactUploader, UploadReport};

use crate::workspace::clear_folder;

/// Uploads a finished job's checkpoints, then clears the scratch folder
pub struct ArtifactPublisher {
    uploader: ArtifactUploader,
    bucket: String,
    suffix: String,
    scratch_folder: PathBuf,
}

impl ArtifactPublisher {
    /// Creates a new artifact publisher
    ///
    /// # Arguments
    /// * `uploader` - Uploader carrying the store and key prefix
    /// * `bucket` - Destination bucket
    /// * `suffix` - Suffix of the checkpoint files to upload
    /// * `scratch_folder` - Folder emptied after the upload
    pub fn new(
        uploader: ArtifactUploader,
        bucket: impl Into<String>,
        suffix: impl Into<String>,
        scratch_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            uploader,
            bucket: bucket.into(),
            suffix: suffix.into(),
            scratch_folder: scratch_folder.into(),
        }
    }

    /// Publishes the checkpoints of a completed job
    ///
    /// A failed upload or scratch clear fails the job; the runner then counts
    /// it as failed only, never also as completed.
    pub async fn publish(&self, config: &JobConfig) -> Result<UploadReport> {
        let checkpoint_dir = config.checkpoint_dir().with_context(|| {
            format!(
                "Job '{}' has no training_folder in its first process",
                config.name
            )
        })?;

        let report = self
            .uploader
            .upload_folder(&checkpoint_dir, &self.bucket, &self.suffix)
            .await
            .with_context(|| {
                format!(
                    "Failed to upload checkpoints from {}",
                    checkpoint_dir.display()
                )
            })?;

        info!("Clearing target folder: {}", self.scratch_folder.display());
        let cleared = clear_folder(&self.scratch_folder)?;
        info!(
            "Removed {} file(s) and {} folder(s) from {}",
            cleared.files,
            cleared.folders,
            self.scratch_folder.display()
        );

        Ok(report)
    }
}
