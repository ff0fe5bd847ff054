//! Scratch folder cleaning
//!
//! After checkpoints are uploaded the scratch folder of the pod is emptied so
//! the next job starts from a clean disk. The folder itself is kept.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// What [`clear_folder`] removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub files: usize,
    pub folders: usize,
}

/// Removes every direct entry of `folder`
///
/// Directories are removed recursively; files and symbolic links are
/// removed individually (links are never followed). Fails if `folder`
/// does not exist.
pub fn clear_folder(folder: &Path) -> Result<ClearReport> {
    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("Failed to list folder {}", folder.display()))?;

    let mut report = ClearReport::default();

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list folder {}", folder.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to inspect {}", path.display()))?;

        if file_type.is_dir() {
            info!("Deleting folder: {}", path.display());
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to delete folder {}", path.display()))?;
            report.folders += 1;
        } else {
            info!("Deleting file: {}", path.display());
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete file {}", path.display()))?;
            report.files += 1;
        }
    }

    Ok(report)
}
