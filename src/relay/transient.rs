//! Request-scoped scratch files.
//!
//! A [`TransientFile`] is created when an upload is accepted and must be
//! gone by the time the request finishes. The normal path awaits
//! [`TransientFile::remove`]; any path that drops the guard instead
//! (early error return, handler future cancelled by a client disconnect)
//! falls back to a synchronous unlink in `Drop`. Exactly one of the two
//! runs.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use uuid::Uuid;

use crate::observability::metrics;

/// Guard owning one staged upload on disk.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    removed: bool,
}

impl TransientFile {
    /// Create a fresh, uniquely named file inside `dir`.
    ///
    /// Returns the guard together with a write handle. `create_new` makes a
    /// name collision an error rather than a shared file.
    pub async fn create(dir: &Path) -> io::Result<(Self, File)> {
        let path = dir.join(Uuid::new_v4().simple().to_string());
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        tracing::debug!(path = %path.display(), "Transient file created");
        Ok((Self { path, removed: false }, file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the file inside the upload directory.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// Delete the file. Failure is logged and absorbed.
    pub async fn remove(mut self) {
        self.removed = true;
        let result = fs::remove_file(&self.path).await;
        report_cleanup(&self.path, result);
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        // Drop cannot await; one unlink is short enough to block on.
        let result = std::fs::remove_file(&self.path);
        report_cleanup(&self.path, result);
    }
}

fn report_cleanup(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "Transient file deleted"),
        Err(e) => {
            metrics::record_cleanup_failure();
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to delete temp file"
            );
        }
    }
}

/// Returns true if `name` looks like a transient file this relay created.
pub fn is_transient_name(name: &str) -> bool {
    name.len() == 32
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (transient, mut file) = TransientFile::create(dir.path()).await.unwrap();
        file.write_all(b"payload").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let path = transient.path().to_path_buf();
        assert!(path.exists());
        assert!(is_transient_name(transient.file_name()));

        transient.remove().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (transient, _file) = TransientFile::create(dir.path()).await.unwrap();
        let path = transient.path().to_path_buf();

        drop(transient);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_after_external_delete_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let (transient, file) = TransientFile::create(dir.path()).await.unwrap();
        drop(file);

        std::fs::remove_file(transient.path()).unwrap();
        transient.remove().await;
    }

    #[tokio::test]
    async fn test_each_file_gets_its_own_name() {
        let dir = tempfile::tempdir().unwrap();
        let (a, _) = TransientFile::create(dir.path()).await.unwrap();
        let (b, _) = TransientFile::create(dir.path()).await.unwrap();
        assert_ne!(a.path(), b.path());

        a.remove().await;
        assert!(b.path().exists());
    }

    #[test]
    fn test_transient_name_shape() {
        assert!(is_transient_name("0123456789abcdef0123456789abcdef"));
        assert!(!is_transient_name("notes.txt"));
        assert!(!is_transient_name("0123456789ABCDEF0123456789ABCDEF"));
        assert!(!is_transient_name("0123456789abcdef0123456789abcdeg"));
    }
}
