//! Checkpoint artifact uploader
//!
//! Selects checkpoint files in a local folder by suffix and sends each one
//! to the object store under `<user_id>/<job_id>/lora_checkpoints/<file name>`.

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::ObjectStore;
use crate::error::{Result, StoreError};

/// Suffix of the checkpoint files produced by the trainer
pub const DEFAULT_CHECKPOINT_SUFFIX: &str = ".safetensors";

/// Fixed sub-path appended to the user/job prefix
pub const CHECKPOINT_SUBPATH: &str = "lora_checkpoints";

/// Remote key prefix for one job's checkpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefix {
    user_id: String,
    job_id: String,
}

impl KeyPrefix {
    pub fn new(user_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            job_id: job_id.into(),
        }
    }

    /// Object key for a file uploaded under this prefix
    pub fn key_for(&self, file_name: &str) -> String {
        format!("{}/{}", self, file_name)
    }
}

impl std::fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.job_id, CHECKPOINT_SUBPATH)
    }
}

/// Summary of one folder upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub bucket: String,
    pub prefix: String,
    /// Object keys in upload order
    pub keys: Vec<String>,
}

/// Lists the regular files directly inside `folder` whose name ends with `suffix`
///
/// Subfolders are not searched. The result is sorted so uploads happen in a
/// stable order. A missing folder yields an empty list.
pub fn matching_files(folder: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*{}",
        Pattern::escape(&folder.to_string_lossy()),
        Pattern::escape(suffix)
    );

    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let entries = glob::glob_with(&pattern, options).map_err(|e| StoreError::InvalidPattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StoreError::Io {
            path: e.path().display().to_string(),
            source: e.into(),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Uploads checkpoint folders through an [`ObjectStore`]
pub struct ArtifactUploader {
    store: Arc<dyn ObjectStore>,
    prefix: KeyPrefix,
}

impl ArtifactUploader {
    /// Creates an uploader writing under `prefix`
    pub fn new(store: Arc<dyn ObjectStore>, prefix: KeyPrefix) -> Self {
        Self { store, prefix }
    }

    /// Uploads every file of `folder` ending with `suffix` to `bucket`
    ///
    /// Stops at the first failed upload and returns its error; files sent
    /// before the failure stay in the bucket.
    pub async fn upload_folder(
        &self,
        folder: &Path,
        bucket: &str,
        suffix: &str,
    ) -> Result<UploadReport> {
        let files = matching_files(folder, suffix)?;
        let prefix = self.prefix.to_string();

        info!("Uploading {} files to {}/{}", files.len(), bucket, prefix);

        let mut keys = Vec::with_capacity(files.len());
        for file in files {
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let key = self.prefix.key_for(&file_name);

            info!("Uploading {} to {}/{}", file.display(), bucket, prefix);
            self.store.put_file(&file, bucket, &key).await?;
            keys.push(key);
        }

        Ok(UploadReport {
            bucket: bucket.to_string(),
            prefix,
            keys,
        })
    }
}
