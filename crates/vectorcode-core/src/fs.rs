//! File access seam.
//!
//! All file reads in the pipelines go through [`FileAccess`], so unit
//! tests run against [`MemoryFiles`] with no disk involved. The real
//! implementation lives in the application crate.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::VcError;

#[async_trait]
pub trait FileAccess: Send + Sync {
    async fn is_dir(&self, path: &Path) -> bool;

    async fn is_file(&self, path: &Path) -> bool;

    /// Read a file's full content. Failure maps to [`VcError::FileRead`].
    async fn read_to_string(&self, path: &Path) -> Result<String, VcError>;

    /// Resolve a path to its canonical absolute form.
    async fn canonicalize(&self, path: &Path) -> Result<PathBuf, VcError>;
}

/// In-memory file tree for tests. Paths are used as given (tests use
/// absolute paths); `canonicalize` is the identity. Reads are logged so
/// tests can assert which files were actually opened.
#[derive(Default)]
pub struct MemoryFiles {
    files: RwLock<HashMap<PathBuf, String>>,
    dirs: RwLock<Vec<PathBuf>>,
    reads: RwLock<Vec<PathBuf>>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.write().unwrap().insert(path.into(), content.into());
    }

    pub fn remove(&self, path: &Path) {
        self.files.write().unwrap().remove(path);
    }

    /// Register a directory that contains no files yet.
    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        self.dirs.write().unwrap().push(path.into());
    }

    /// Every path passed to `read_to_string` so far, in call order.
    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.read().unwrap().clone()
    }
}

#[async_trait]
impl FileAccess for MemoryFiles {
    async fn is_dir(&self, path: &Path) -> bool {
        if self.dirs.read().unwrap().iter().any(|d| d == path) {
            return true;
        }
        let files = self.files.read().unwrap();
        files.keys().any(|k| k != path && k.starts_with(path))
    }

    async fn is_file(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, VcError> {
        self.reads.write().unwrap().push(path.to_path_buf());
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| VcError::FileRead {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            })
    }

    async fn canonicalize(&self, path: &Path) -> Result<PathBuf, VcError> {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_files_basics() {
        let files = MemoryFiles::new();
        files.insert("/p/a.py", "print('a')");

        assert!(files.is_file(Path::new("/p/a.py")).await);
        assert!(files.is_dir(Path::new("/p")).await);
        assert!(!files.is_dir(Path::new("/p/a.py")).await);
        assert_eq!(
            files.read_to_string(Path::new("/p/a.py")).await.unwrap(),
            "print('a')"
        );
        assert_eq!(files.reads(), vec![PathBuf::from("/p/a.py")]);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let files = MemoryFiles::new();
        let err = files.read_to_string(Path::new("/p/gone.py")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
