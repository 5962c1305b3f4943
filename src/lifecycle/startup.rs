//! Startup preparation.
//!
//! # Responsibilities
//! - Ensure the upload directory exists
//! - Remove transient files orphaned by a previous crash
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use crate::relay::downstream::DownstreamSetupError;
use crate::relay::transient::is_transient_name;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to prepare upload directory {path}: {source}")]
    UploadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Downstream(#[from] DownstreamSetupError),
}

/// Create the upload directory and clear orphaned transient files.
///
/// Only names shaped like a transient file are touched; anything else in
/// the directory is left alone. Returns how many orphans were removed.
pub async fn prepare_upload_dir(dir: &Path) -> Result<usize, StartupError> {
    let wrap = |source| StartupError::UploadDir {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).await.map_err(wrap)?;

    let mut removed = 0;
    let mut entries = fs::read_dir(dir).await.map_err(wrap)?;
    while let Some(entry) = entries.next_entry().await.map_err(wrap)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_transient_name(name) {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(
                path = %entry.path().display(),
                error = %e,
                "Failed to remove orphaned transient file"
            ),
        }
    }

    if removed > 0 {
        tracing::info!(
            directory = %dir.display(),
            removed,
            "Removed orphaned transient files"
        );
    }
    Ok(removed)
}
