//! Local filesystem access through the [`FileAccess`] seam.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use vectorcode_core::error::VcError;
use vectorcode_core::fs::FileAccess;

pub struct LocalFiles;

#[async_trait]
impl FileAccess for LocalFiles {
    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, VcError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| VcError::FileRead {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn canonicalize(&self, path: &Path) -> Result<PathBuf, VcError> {
        tokio::fs::canonicalize(path)
            .await
            .map_err(|_| VcError::InvalidProjectRoot(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_and_classifies_real_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        tokio::fs::write(&file, "hello").await.unwrap();

        let files = LocalFiles;
        assert!(files.is_dir(dir.path()).await);
        assert!(files.is_file(&file).await);
        assert!(!files.is_file(dir.path()).await);
        assert_eq!(files.read_to_string(&file).await.unwrap(), "hello");

        let missing = dir.path().join("missing.txt");
        let err = files.read_to_string(&missing).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
