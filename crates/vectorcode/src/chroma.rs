//! Chroma-compatible REST store gateway.
//!
//! Talks to a Chroma server over its v1 HTTP API. Each chunk is stored as
//! one record whose metadata carries the owning file, the file's content
//! hash, and the chunk's position, which is enough to rebuild the tracked
//! file table without a side channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use vectorcode_core::error::VcError;
use vectorcode_core::models::{Chunk, FileRecord, RawHit};
use vectorcode_core::store::{
    collection_name, CollectionHandle, CollectionInfo, StoreConnector, VectorStore,
    METADATA_PATH_KEY,
};

const FINGERPRINT_KEY: &str = "sha256";
const CHUNK_INDEX_KEY: &str = "chunk_index";

pub struct ChromaStore {
    client: reqwest::Client,
    base: String,
    host: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct CollectionBody {
    id: String,
    name: String,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GetBody {
    ids: Vec<String>,
    #[serde(default)]
    metadatas: Option<Vec<Option<serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    ids: Vec<Vec<String>>,
    distances: Vec<Vec<f32>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<serde_json::Value>>>>,
}

#[derive(Debug, Deserialize)]
struct PreFlightBody {
    max_batch_size: usize,
}

impl ChromaStore {
    fn new(client: reqwest::Client, host: &str, port: u16) -> Self {
        Self {
            client,
            base: format!("http://{host}:{port}/api/v1"),
            host: host.to_string(),
            port,
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> VcError {
        if err.is_connect() || err.is_timeout() {
            VcError::StoreUnavailable {
                host: self.host.clone(),
                port: self.port,
            }
        } else {
            VcError::Store(err.to_string())
        }
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, VcError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(VcError::Store(format!("store returned {status}: {body}")))
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, VcError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.check(response)
            .await?
            .json()
            .await
            .map_err(|e| VcError::Store(format!("malformed store response: {e}")))
    }
}

fn meta_str(metadata: &Option<serde_json::Value>, key: &str) -> Option<String> {
    metadata
        .as_ref()
        .and_then(|m| m.get(key))
        .and_then(|v| v.as_str())
        .map(String::from)
}

fn meta_index(metadata: &Option<serde_json::Value>) -> usize {
    metadata
        .as_ref()
        .and_then(|m| m.get(CHUNK_INDEX_KEY))
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize
}

/// Rebuild the tracked file table from a raw record dump.
fn file_records_from(body: GetBody) -> Vec<FileRecord> {
    let metadatas = body.metadatas.unwrap_or_default();
    let mut per_file: std::collections::HashMap<PathBuf, (String, Vec<(usize, String)>)> =
        std::collections::HashMap::new();
    for (i, id) in body.ids.into_iter().enumerate() {
        let metadata = metadatas.get(i).cloned().flatten();
        let Some(path) = meta_str(&metadata, METADATA_PATH_KEY) else {
            continue;
        };
        let fingerprint = meta_str(&metadata, FINGERPRINT_KEY).unwrap_or_default();
        let index = meta_index(&metadata);
        let entry = per_file
            .entry(PathBuf::from(path))
            .or_insert_with(|| (fingerprint.clone(), Vec::new()));
        entry.1.push((index, id));
    }
    let mut records: Vec<FileRecord> = per_file
        .into_iter()
        .map(|(path, (fingerprint, mut chunks))| {
            chunks.sort_by_key(|(index, _)| *index);
            FileRecord {
                path,
                fingerprint,
                chunk_ids: chunks.into_iter().map(|(_, id)| id).collect(),
            }
        })
        .collect();
    records.sort_by(|a, b| a.path.cmp(&b.path));
    records
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn probe(&self) -> bool {
        match self
            .client
            .get(format!("{}/heartbeat", self.base))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn max_batch_size(&self) -> Result<usize, VcError> {
        let response = self
            .client
            .get(format!("{}/pre-flight-checks", self.base))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body: PreFlightBody = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| VcError::Store(format!("malformed store response: {e}")))?;
        Ok(body.max_batch_size.max(1))
    }

    async fn get_or_create_collection(
        &self,
        project_root: &Path,
        metadata: serde_json::Value,
    ) -> Result<CollectionHandle, VcError> {
        let body: CollectionBody = self
            .post_json(
                "/collections",
                &json!({
                    "name": collection_name(project_root),
                    "metadata": metadata,
                    "get_or_create": true,
                }),
            )
            .await?;
        Ok(CollectionHandle {
            id: body.id,
            name: body.name,
            metadata: body.metadata.unwrap_or(serde_json::Value::Null),
        })
    }

    async fn get_collection(&self, project_root: &Path) -> Result<CollectionHandle, VcError> {
        let name = collection_name(project_root);
        let response = self
            .client
            .get(format!("{}/collections/{name}", self.base))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND
            || response.status() == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        {
            return Err(VcError::CollectionAccess {
                project_root: project_root.to_path_buf(),
                reason: "project has not been vectorised".to_string(),
            });
        }
        let body: CollectionBody = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| VcError::Store(format!("malformed store response: {e}")))?;
        Ok(CollectionHandle {
            id: body.id,
            name: body.name,
            metadata: body.metadata.unwrap_or(serde_json::Value::Null),
        })
    }

    async fn tracked_files(
        &self,
        collection: &CollectionHandle,
    ) -> Result<Vec<FileRecord>, VcError> {
        let body: GetBody = self
            .post_json(
                &format!("/collections/{}/get", collection.id),
                &json!({ "include": ["metadatas"] }),
            )
            .await?;
        Ok(file_records_from(body))
    }

    async fn upsert(
        &self,
        collection: &CollectionHandle,
        chunks: &[Chunk],
    ) -> Result<(), VcError> {
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let embeddings: Vec<&[f32]> = chunks.iter().map(|c| c.embedding.as_slice()).collect();
        let documents: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let metadatas: Vec<serde_json::Value> = chunks
            .iter()
            .map(|c| {
                json!({
                    METADATA_PATH_KEY: c.path.display().to_string(),
                    FINGERPRINT_KEY: c.fingerprint,
                    CHUNK_INDEX_KEY: c.index,
                })
            })
            .collect();
        debug!(collection = %collection.name, count = chunks.len(), "upserting chunk batch");
        let _: serde_json::Value = self
            .post_json(
                &format!("/collections/{}/upsert", collection.id),
                &json!({
                    "ids": ids,
                    "embeddings": embeddings,
                    "documents": documents,
                    "metadatas": metadatas,
                }),
            )
            .await?;
        Ok(())
    }

    async fn delete_chunks(
        &self,
        collection: &CollectionHandle,
        chunk_ids: &[String],
    ) -> Result<(), VcError> {
        if chunk_ids.is_empty() {
            return Ok(());
        }
        let _: serde_json::Value = self
            .post_json(
                &format!("/collections/{}/delete", collection.id),
                &json!({ "ids": chunk_ids }),
            )
            .await?;
        Ok(())
    }

    async fn delete_files(
        &self,
        collection: &CollectionHandle,
        paths: &[PathBuf],
    ) -> Result<(), VcError> {
        if paths.is_empty() {
            return Ok(());
        }
        let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        let _: serde_json::Value = self
            .post_json(
                &format!("/collections/{}/delete", collection.id),
                &json!({ "where": { METADATA_PATH_KEY: { "$in": paths } } }),
            )
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<RawHit>, VcError> {
        let body: QueryBody = self
            .post_json(
                &format!("/collections/{}/query", collection.id),
                &json!({
                    "query_embeddings": [embedding],
                    "n_results": n_results,
                    "include": ["metadatas", "distances"],
                }),
            )
            .await?;
        let ids = body.ids.into_iter().next().unwrap_or_default();
        let distances = body.distances.into_iter().next().unwrap_or_default();
        let metadatas = body
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();
        let hits = ids
            .into_iter()
            .zip(distances)
            .enumerate()
            .map(|(i, (chunk_id, distance))| {
                let metadata = metadatas.get(i).cloned().flatten();
                RawHit {
                    chunk_id,
                    path: meta_str(&metadata, METADATA_PATH_KEY).map(PathBuf::from),
                    distance,
                }
            })
            .collect();
        Ok(hits)
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VcError> {
        let response = self
            .client
            .get(format!("{}/collections", self.base))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let bodies: Vec<CollectionBody> = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| VcError::Store(format!("malformed store response: {e}")))?;
        Ok(bodies
            .into_iter()
            .map(|b| CollectionInfo {
                name: b.name,
                metadata: b.metadata,
            })
            .collect())
    }
}

/// Connects to a Chroma server, probing it before handing the store out.
pub struct ChromaConnector {
    client: reqwest::Client,
}

impl ChromaConnector {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ChromaConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreConnector for ChromaConnector {
    async fn connect(&self, host: &str, port: u16) -> Result<Arc<dyn VectorStore>, VcError> {
        let store = ChromaStore::new(self.client.clone(), host, port);
        if !store.probe().await {
            return Err(VcError::StoreUnavailable {
                host: host.to_string(),
                port,
            });
        }
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_records_group_and_order_chunks() {
        let body = GetBody {
            ids: vec!["b0".into(), "a1".into(), "a0".into(), "stray".into()],
            metadatas: Some(vec![
                Some(json!({ "path": "b.rs", "sha256": "fb", "chunk_index": 0 })),
                Some(json!({ "path": "a.rs", "sha256": "fa", "chunk_index": 1 })),
                Some(json!({ "path": "a.rs", "sha256": "fa", "chunk_index": 0 })),
                None,
            ]),
        };
        let records = file_records_from(body);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, PathBuf::from("a.rs"));
        assert_eq!(records[0].fingerprint, "fa");
        assert_eq!(records[0].chunk_ids, vec!["a0".to_string(), "a1".to_string()]);
        assert_eq!(records[1].chunk_ids, vec!["b0".to_string()]);
    }
}
