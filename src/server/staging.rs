use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::utils::filename::sanitize_filename;

/// An uploaded file written to the scratch directory for the duration of one request.
///
/// The file is removed when the value is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub async fn create(dir: &Path, original_name: &str, contents: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name));
        let path = absolute(&dir.join(file_name))?;

        // Own the path before writing so a partial write is cleaned up too.
        let staged = Self { path };
        tokio::fs::write(&staged.path, contents).await?;
        debug!("Staged {} bytes at {}", contents.len(), staged.path.display());

        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute path with forward slashes, the form handed to the agents.
    pub fn posix_path(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged file {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove staged file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_lives_until_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "10-K.pdf", b"%PDF-1.4")
            .await
            .unwrap();

        let path = staged.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
        assert!(path.is_absolute());
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_10-K.pdf"));
        assert_eq!(name.len(), 36 + 1 + "10-K.pdf".len());

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn creates_missing_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("temp_uploads");

        let staged = StagedFile::create(&scratch, "a.pdf", b"x").await.unwrap();
        assert!(staged.path().starts_with(&scratch));
        assert!(!staged.posix_path().contains('\\'));
    }

    #[tokio::test]
    async fn hostile_names_stay_inside_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "../../escape.pdf", b"x")
            .await
            .unwrap();

        assert_eq!(staged.path().parent().unwrap(), dir.path());
    }

    #[tokio::test]
    async fn drop_tolerates_already_removed_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "a.pdf", b"x").await.unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        drop(staged);
    }
}
