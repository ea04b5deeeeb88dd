//! Vector store gateway abstraction.
//!
//! [`VectorStore`] defines every operation the pipelines need from the
//! backing store; [`StoreConnector`] builds a connected store from a
//! host/port pair, probing reachability as part of connecting. The store
//! engine itself (indexing, ANN search) lives behind these traits: the
//! application crate ships a Chroma-compatible REST implementation and
//! this crate ships [`memory::InMemoryStore`] for tests.

pub mod memory;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::VcError;
use crate::models::{Chunk, FileRecord, RawHit};

/// Metadata key under which a collection records its project root.
pub const METADATA_PATH_KEY: &str = "path";

/// An open collection in the backing store.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    /// Store-side identifier used in subsequent calls.
    pub id: String,
    pub name: String,
    pub metadata: serde_json::Value,
}

/// Raw listing entry from the store; metadata may be absent or malformed.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub name: String,
    pub metadata: Option<serde_json::Value>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Liveness probe against the backing store.
    async fn probe(&self) -> bool;

    /// Largest number of chunks a single upsert call may carry. Callers
    /// split their writes into batches of at most this size.
    async fn max_batch_size(&self) -> Result<usize, VcError>;

    /// Open the collection for a project root, creating it when missing.
    async fn get_or_create_collection(
        &self,
        project_root: &Path,
        metadata: serde_json::Value,
    ) -> Result<CollectionHandle, VcError>;

    /// Open an existing collection; [`VcError::CollectionAccess`] when the
    /// project has never been vectorized.
    async fn get_collection(&self, project_root: &Path) -> Result<CollectionHandle, VcError>;

    /// Files the collection currently tracks, reconstructed from stored
    /// chunk metadata.
    async fn tracked_files(&self, collection: &CollectionHandle)
        -> Result<Vec<FileRecord>, VcError>;

    /// Insert or replace chunks by id. One call is one store batch.
    async fn upsert(&self, collection: &CollectionHandle, chunks: &[Chunk])
        -> Result<(), VcError>;

    /// Remove specific chunks, used to retire a file's previous generation.
    async fn delete_chunks(
        &self,
        collection: &CollectionHandle,
        chunk_ids: &[String],
    ) -> Result<(), VcError>;

    /// Remove everything stored for the given file paths.
    async fn delete_files(
        &self,
        collection: &CollectionHandle,
        paths: &[PathBuf],
    ) -> Result<(), VcError>;

    /// Nearest chunks to `embedding`, ascending by distance.
    async fn query(
        &self,
        collection: &CollectionHandle,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<RawHit>, VcError>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VcError>;
}

/// Builds a connected [`VectorStore`] for a host/port pair. Connecting
/// includes the reachability probe: an unreachable store fails here with
/// [`VcError::StoreUnavailable`] and nothing is returned to cache.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<Arc<dyn VectorStore>, VcError>;
}

/// Stable collection name for a project root: a `vectorcode-` prefix plus
/// the first 16 hex digits of the SHA-256 of the canonical root. The root
/// itself is recorded in collection metadata under [`METADATA_PATH_KEY`].
pub fn collection_name(project_root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_root.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("vectorcode-{}", &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_stable_per_root() {
        let a = collection_name(Path::new("/home/user/project"));
        assert_eq!(a, collection_name(Path::new("/home/user/project")));
        assert_ne!(a, collection_name(Path::new("/home/user/other")));
        assert!(a.starts_with("vectorcode-"));
        assert_eq!(a.len(), "vectorcode-".len() + 16);
    }
}
