//! Core data models that flow through the vectorization and query pipelines.

use std::path::PathBuf;

use serde::Serialize;

/// A contiguous slice of a file's text plus its embedding, the unit of
/// storage and retrieval. The embedding is opaque to the core; it is filled
/// in by whichever [`Embedder`](crate::embedding::Embedder) is injected.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Deterministic id derived from path, fingerprint, and index.
    pub id: String,
    /// Owning file, as tracked in the collection.
    pub path: PathBuf,
    /// Position of this chunk within the file's chunk sequence.
    pub index: usize,
    /// The text span itself.
    pub text: String,
    /// Fingerprint of the whole file this chunk was cut from.
    pub fingerprint: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

/// What the store currently tracks for one file: its fingerprint at the
/// time of the last vectorization and the ids of its stored chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub fingerprint: String,
    pub chunk_ids: Vec<String>,
}

/// A raw hit returned by the store, before path resolution and dedup.
#[derive(Debug, Clone)]
pub struct RawHit {
    pub chunk_id: String,
    /// Owning file path from stored metadata; hits without one are dropped
    /// by the query pipeline.
    pub path: Option<PathBuf>,
    /// Distance to the query embedding; lower is better.
    pub distance: f32,
}

/// One entry in a query response. Paths are unique across a response.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub path: PathBuf,
    /// Current file content, or `None` when the file is gone or unreadable
    /// (the match itself is still informative) or when the configured
    /// include set omits document content.
    pub content: Option<String>,
    pub distance: f32,
    /// Zero-based position after dedup and truncation.
    pub rank: usize,
}

/// Maps a store collection back to the project root it indexes.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionDescriptor {
    pub project_root: PathBuf,
    pub metadata: serde_json::Value,
}

/// Counters reported by a vectorization run. `skipped` covers excluded,
/// unchanged, and unreadable files alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VectoriseStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
}
