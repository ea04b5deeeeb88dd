//! In-memory [`VectorStore`] used by the test suites.
//!
//! Brute-force cosine scan over stored chunks, plus enough instrumentation
//! to assert on store traffic: upsert batch sizes are recorded, writes can
//! be made to fail on demand, and the connector counts probe attempts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::VcError;
use crate::models::{Chunk, FileRecord, RawHit};
use crate::store::{
    collection_name, CollectionHandle, CollectionInfo, StoreConnector, VectorStore,
};

#[derive(Default)]
struct Collection {
    metadata: serde_json::Value,
    chunks: HashMap<String, Chunk>,
}

/// Store double with a configurable batch limit and fault injection.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    max_batch: usize,
    batch_log: RwLock<Vec<usize>>,
    fail_upserts: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_max_batch(64)
    }

    pub fn with_max_batch(max_batch: usize) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            max_batch,
            batch_log: RwLock::new(Vec::new()),
            fail_upserts: AtomicBool::new(false),
        }
    }

    /// Sizes of every upsert batch received, in call order.
    pub fn upsert_batches(&self) -> Vec<usize> {
        self.batch_log.read().unwrap().clone()
    }

    /// When set, every upsert fails with a store error.
    pub fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn chunk_count(&self, collection: &CollectionHandle) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(&collection.name)
            .map(|c| c.chunks.len())
            .unwrap_or(0)
    }

    fn resolve(&self, project_root: &Path) -> String {
        collection_name(project_root)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn probe(&self) -> bool {
        true
    }

    async fn max_batch_size(&self) -> Result<usize, VcError> {
        Ok(self.max_batch)
    }

    async fn get_or_create_collection(
        &self,
        project_root: &Path,
        metadata: serde_json::Value,
    ) -> Result<CollectionHandle, VcError> {
        let name = self.resolve(project_root);
        let mut collections = self.collections.write().unwrap();
        let entry = collections.entry(name.clone()).or_insert_with(|| Collection {
            metadata,
            chunks: HashMap::new(),
        });
        Ok(CollectionHandle {
            id: name.clone(),
            name,
            metadata: entry.metadata.clone(),
        })
    }

    async fn get_collection(&self, project_root: &Path) -> Result<CollectionHandle, VcError> {
        let name = self.resolve(project_root);
        let collections = self.collections.read().unwrap();
        match collections.get(&name) {
            Some(entry) => Ok(CollectionHandle {
                id: name.clone(),
                name,
                metadata: entry.metadata.clone(),
            }),
            None => Err(VcError::CollectionAccess {
                project_root: project_root.to_path_buf(),
                reason: "collection does not exist".into(),
            }),
        }
    }

    async fn tracked_files(
        &self,
        collection: &CollectionHandle,
    ) -> Result<Vec<FileRecord>, VcError> {
        let collections = self.collections.read().unwrap();
        let entry = collections.get(&collection.name).ok_or_else(|| {
            VcError::Store(format!("unknown collection {}", collection.name))
        })?;
        let mut by_path: HashMap<PathBuf, Vec<&Chunk>> = HashMap::new();
        for chunk in entry.chunks.values() {
            by_path.entry(chunk.path.clone()).or_default().push(chunk);
        }
        let mut records: Vec<FileRecord> = by_path
            .into_iter()
            .map(|(path, mut chunks)| {
                chunks.sort_by_key(|c| c.index);
                FileRecord {
                    path,
                    fingerprint: chunks[0].fingerprint.clone(),
                    chunk_ids: chunks.iter().map(|c| c.id.clone()).collect(),
                }
            })
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }

    async fn upsert(
        &self,
        collection: &CollectionHandle,
        chunks: &[Chunk],
    ) -> Result<(), VcError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(VcError::Store("simulated upsert failure".into()));
        }
        if chunks.len() > self.max_batch {
            return Err(VcError::Store(format!(
                "batch of {} exceeds limit {}",
                chunks.len(),
                self.max_batch
            )));
        }
        self.batch_log.write().unwrap().push(chunks.len());
        let mut collections = self.collections.write().unwrap();
        let entry = collections.get_mut(&collection.name).ok_or_else(|| {
            VcError::Store(format!("unknown collection {}", collection.name))
        })?;
        for chunk in chunks {
            entry.chunks.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn delete_chunks(
        &self,
        collection: &CollectionHandle,
        chunk_ids: &[String],
    ) -> Result<(), VcError> {
        let mut collections = self.collections.write().unwrap();
        if let Some(entry) = collections.get_mut(&collection.name) {
            for id in chunk_ids {
                entry.chunks.remove(id);
            }
        }
        Ok(())
    }

    async fn delete_files(
        &self,
        collection: &CollectionHandle,
        paths: &[PathBuf],
    ) -> Result<(), VcError> {
        let mut collections = self.collections.write().unwrap();
        if let Some(entry) = collections.get_mut(&collection.name) {
            entry.chunks.retain(|_, chunk| !paths.contains(&chunk.path));
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<RawHit>, VcError> {
        let collections = self.collections.read().unwrap();
        let entry = collections.get(&collection.name).ok_or_else(|| {
            VcError::Store(format!("unknown collection {}", collection.name))
        })?;
        let mut hits: Vec<RawHit> = entry
            .chunks
            .values()
            .map(|chunk| RawHit {
                chunk_id: chunk.id.clone(),
                path: Some(chunk.path.clone()),
                distance: 1.0 - cosine_similarity(embedding, &chunk.embedding),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(n_results);
        Ok(hits)
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VcError> {
        let collections = self.collections.read().unwrap();
        let mut infos: Vec<CollectionInfo> = collections
            .iter()
            .map(|(name, entry)| CollectionInfo {
                name: name.clone(),
                metadata: if entry.metadata.is_null() {
                    None
                } else {
                    Some(entry.metadata.clone())
                },
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }
}

/// Connector double. Counts probe attempts and can be switched offline to
/// simulate an unreachable store.
pub struct MemoryConnector {
    store: Arc<InMemoryStore>,
    available: AtomicBool,
    probes: AtomicUsize,
}

impl MemoryConnector {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            available: AtomicBool::new(true),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of connect attempts made so far.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, host: &str, port: u16) -> Result<Arc<dyn VectorStore>, VcError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(VcError::StoreUnavailable {
                host: host.to_string(),
                port,
            });
        }
        Ok(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::METADATA_PATH_KEY;
    use serde_json::json;

    fn chunk(id: &str, path: &str, index: usize, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            path: PathBuf::from(path),
            index,
            text: format!("text {id}"),
            fingerprint: "fp".to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_and_query_ranks_by_distance() {
        let store = InMemoryStore::new();
        let root = Path::new("/proj");
        let coll = store
            .get_or_create_collection(root, json!({ METADATA_PATH_KEY: "/proj" }))
            .await
            .unwrap();
        store
            .upsert(
                &coll,
                &[
                    chunk("a", "a.rs", 0, vec![1.0, 0.0]),
                    chunk("b", "b.rs", 0, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        store
            .upsert(&coll, &[chunk("a", "a.rs", 0, vec![0.9, 0.1])])
            .await
            .unwrap();
        assert_eq!(store.chunk_count(&coll), 2);

        let hits = store.query(&coll, &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, "a");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn tracked_files_groups_chunks_per_path() {
        let store = InMemoryStore::new();
        let coll = store
            .get_or_create_collection(Path::new("/proj"), serde_json::Value::Null)
            .await
            .unwrap();
        store
            .upsert(
                &coll,
                &[
                    chunk("a1", "a.rs", 1, vec![1.0]),
                    chunk("a0", "a.rs", 0, vec![1.0]),
                    chunk("b0", "b.rs", 0, vec![1.0]),
                ],
            )
            .await
            .unwrap();
        let records = store.tracked_files(&coll).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, PathBuf::from("a.rs"));
        assert_eq!(records[0].chunk_ids, vec!["a0".to_string(), "a1".to_string()]);
    }

    #[tokio::test]
    async fn get_collection_requires_prior_creation() {
        let store = InMemoryStore::new();
        let err = store.get_collection(Path::new("/never")).await.unwrap_err();
        assert!(matches!(err, VcError::CollectionAccess { .. }));
    }

    #[tokio::test]
    async fn offline_connector_reports_unavailable() {
        let connector = MemoryConnector::new(Arc::new(InMemoryStore::new()));
        connector.set_available(false);
        let err = connector.connect("localhost", 8000).await.err().unwrap();
        assert!(matches!(err, VcError::StoreUnavailable { .. }));
        assert_eq!(connector.probe_count(), 1);
    }
}
