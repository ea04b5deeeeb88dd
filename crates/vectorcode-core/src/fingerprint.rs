//! Content fingerprints and change classification.
//!
//! A fingerprint is the SHA-256 of a file's content; identical content
//! always yields the same fingerprint regardless of mtime, which is the
//! dedup guarantee behind incremental vectorization.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// How a file relates to what the store already tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// No stored fingerprint for this path.
    New,
    /// Stored fingerprint differs from the current content.
    Changed,
    /// Stored fingerprint matches; re-embedding would be a no-op.
    Unchanged,
}

/// SHA-256 hex digest of `content`.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Classify a file given its current fingerprint and the one the store
/// recorded for it, if any.
pub fn classify(current: &str, stored: Option<&str>) -> FileStatus {
    match stored {
        None => FileStatus::New,
        Some(prev) if prev == current => FileStatus::Unchanged,
        Some(_) => FileStatus::Changed,
    }
}

/// Tracked paths that are no longer present. Sorted for deterministic
/// deletion order.
pub fn find_deleted<'a>(
    tracked: impl IntoIterator<Item = &'a PathBuf>,
    present: &HashSet<PathBuf>,
) -> Vec<PathBuf> {
    let mut deleted: Vec<PathBuf> = tracked
        .into_iter()
        .filter(|p| !present.contains(*p))
        .cloned()
        .collect();
    deleted.sort();
    deleted
}

/// Deterministic chunk id: hash of the owning path, the file fingerprint,
/// and the chunk index. Re-vectorizing identical content reproduces the
/// same ids, so upserts of an unchanged generation are true no-ops.
pub fn chunk_id(path: &Path, file_fingerprint: &str, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(file_fingerprint.as_bytes());
    hasher.update([0u8]);
    hasher.update(index.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_identical_fingerprint() {
        assert_eq!(fingerprint("fn main() {}"), fingerprint("fn main() {}"));
        assert_ne!(fingerprint("a"), fingerprint("b"));
    }

    #[test]
    fn classify_states() {
        let fp = fingerprint("content");
        assert_eq!(classify(&fp, None), FileStatus::New);
        assert_eq!(classify(&fp, Some(&fp)), FileStatus::Unchanged);
        assert_eq!(classify(&fp, Some("other")), FileStatus::Changed);
    }

    #[test]
    fn find_deleted_is_set_difference() {
        let tracked = vec![PathBuf::from("/p/a.py"), PathBuf::from("/p/b.py")];
        let present: HashSet<PathBuf> = [PathBuf::from("/p/b.py")].into_iter().collect();
        assert_eq!(
            find_deleted(&tracked, &present),
            vec![PathBuf::from("/p/a.py")]
        );
    }

    #[test]
    fn chunk_ids_stable_and_distinct() {
        let fp = fingerprint("content");
        let a = chunk_id(Path::new("/p/f.py"), &fp, 0);
        assert_eq!(a, chunk_id(Path::new("/p/f.py"), &fp, 0));
        assert_ne!(a, chunk_id(Path::new("/p/f.py"), &fp, 1));
        assert_ne!(a, chunk_id(Path::new("/p/g.py"), &fp, 0));
    }
}
