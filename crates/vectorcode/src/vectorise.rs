//! Indexing pipeline.
//!
//! Takes a resolved project context and a list of candidate files, and
//! brings the project's collection in line with their current contents:
//! excluded files are skipped without being read, unchanged files are
//! skipped by fingerprint, new and changed files are chunked, embedded
//! and upserted in store-sized batches, and files absent from the input
//! are removed from the collection. A changed file's previous chunks are
//! deleted only after its new chunks are stored, so a crash mid-file
//! leaves the old generation queryable rather than a gap.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vectorcode_core::chunk::chunk_text;
use vectorcode_core::embedding::Embedder;
use vectorcode_core::error::VcError;
use vectorcode_core::fingerprint::{self, FileStatus};
use vectorcode_core::fs::FileAccess;
use vectorcode_core::models::{Chunk, FileRecord, VectoriseStats};
use vectorcode_core::progress::{ProgressEvent, ProgressReporter};
use vectorcode_core::store::METADATA_PATH_KEY;

use crate::cache::ProjectContext;
use crate::config;

const TASK: &str = "vectorise";

/// Indexing failure, carrying the counts accumulated before the abort.
#[derive(Debug, Error)]
#[error("vectorisation aborted after {} added, {} updated: {source}", partial.added, partial.updated)]
pub struct VectoriseError {
    pub partial: VectoriseStats,
    #[source]
    pub source: VcError,
}

pub struct Vectoriser {
    files: Arc<dyn FileAccess>,
    embedder: Arc<dyn Embedder>,
    progress: Arc<dyn ProgressReporter>,
}

impl Vectoriser {
    pub fn new(
        files: Arc<dyn FileAccess>,
        embedder: Arc<dyn Embedder>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            files,
            embedder,
            progress,
        }
    }

    /// Index `paths` into the project's collection. Cancellation stops
    /// between files and skips the removal phase; everything already
    /// stored stays stored.
    pub async fn vectorise(
        &self,
        ctx: &ProjectContext,
        paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<VectoriseStats, VectoriseError> {
        let mut stats = VectoriseStats::default();
        let abort = |stats: VectoriseStats, source: VcError| VectoriseError {
            partial: stats,
            source,
        };

        ctx.config.validate().map_err(|e| abort(stats, e))?;
        let mut metadata = json!({ METADATA_PATH_KEY: ctx.project_root.display().to_string() });
        for (key, value) in &ctx.config.db_settings {
            metadata[key] = value.clone();
        }
        let collection = ctx
            .store
            .get_or_create_collection(&ctx.project_root, metadata)
            .await
            .map_err(|e| abort(stats, e))?;
        let max_batch = ctx
            .store
            .max_batch_size()
            .await
            .map_err(|e| abort(stats, e))?
            .max(1);
        let exclusions =
            config::load_exclusions(self.files.as_ref(), &ctx.config, &ctx.project_root).await;
        let tracked: HashMap<PathBuf, FileRecord> = ctx
            .store
            .tracked_files(&collection)
            .await
            .map_err(|e| abort(stats, e))?
            .into_iter()
            .map(|record| (record.path.clone(), record))
            .collect();

        self.progress.report(ProgressEvent::Begin {
            task: TASK.to_string(),
            total: Some(paths.len() as u64),
        });

        let mut present: HashSet<PathBuf> = HashSet::new();
        let mut cancelled = false;
        for (done, path) in paths.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let rel = path
                .strip_prefix(&ctx.project_root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());

            if exclusions.is_excluded(&rel) {
                stats.skipped += 1;
            } else {
                match self.files.read_to_string(path).await {
                    Ok(content) => {
                        let fp = fingerprint::fingerprint(&content);
                        let record = tracked.get(&rel);
                        match fingerprint::classify(&fp, record.map(|r| r.fingerprint.as_str())) {
                            FileStatus::Unchanged => stats.skipped += 1,
                            status => {
                                debug!(path = %rel.display(), ?status, "indexing file");
                                self.index_file(ctx, &collection, max_batch, &rel, &content, &fp)
                                    .await
                                    .map_err(|e| abort(stats, e))?;
                                if let Some(record) = record {
                                    ctx.store
                                        .delete_chunks(&collection, &record.chunk_ids)
                                        .await
                                        .map_err(|e| abort(stats, e))?;
                                }
                                match status {
                                    FileStatus::New => stats.added += 1,
                                    _ => stats.updated += 1,
                                }
                            }
                        }
                        present.insert(rel);
                    }
                    Err(e) if e.is_not_found() => {
                        stats.skipped += 1;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable file");
                        stats.skipped += 1;
                        present.insert(rel);
                    }
                }
            }
            self.progress.report(ProgressEvent::Advance {
                task: TASK.to_string(),
                done: done as u64 + 1,
                total: paths.len() as u64,
            });
        }

        // A token cancelled before the loop ever ran must also suppress
        // removal, so the flag alone is not enough.
        if cancel.is_cancelled() {
            cancelled = true;
        }
        if !cancelled {
            let orphans = fingerprint::find_deleted(tracked.keys(), &present);
            if !orphans.is_empty() {
                ctx.store
                    .delete_files(&collection, &orphans)
                    .await
                    .map_err(|e| abort(stats, e))?;
                stats.removed = orphans.len();
            }
        }

        self.progress.report(ProgressEvent::End {
            task: TASK.to_string(),
        });
        info!(
            added = stats.added,
            updated = stats.updated,
            removed = stats.removed,
            skipped = stats.skipped,
            cancelled,
            "vectorise finished"
        );
        Ok(stats)
    }

    async fn index_file(
        &self,
        ctx: &ProjectContext,
        collection: &vectorcode_core::store::CollectionHandle,
        max_batch: usize,
        rel: &Path,
        content: &str,
        fp: &str,
    ) -> Result<(), VcError> {
        let pieces = chunk_text(content, ctx.config.chunk_size, ctx.config.overlap_ratio)?;
        let embeddings = self.embedder.embed(&pieces).await?;
        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| Chunk {
                id: fingerprint::chunk_id(rel, fp, index),
                path: rel.to_path_buf(),
                index,
                text,
                fingerprint: fp.to_string(),
                embedding,
            })
            .collect();
        for batch in chunks.chunks(max_batch) {
            ctx.store.upsert(collection, batch).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vectorcode_core::embedding::HashEmbedder;
    use vectorcode_core::fs::MemoryFiles;
    use vectorcode_core::progress::NoProgress;
    use vectorcode_core::store::memory::InMemoryStore;
    use vectorcode_core::store::VectorStore;

    fn context(store: Arc<InMemoryStore>) -> ProjectContext {
        ProjectContext {
            project_root: PathBuf::from("/proj"),
            config: crate::config::ProjectConfig::default(),
            store,
        }
    }

    fn vectoriser(files: Arc<MemoryFiles>) -> Vectoriser {
        Vectoriser::new(files, Arc::new(HashEmbedder::new(16)), Arc::new(NoProgress))
    }

    #[tokio::test]
    async fn empty_input_does_nothing() {
        let files = Arc::new(MemoryFiles::new());
        let store = Arc::new(InMemoryStore::new());
        let ctx = context(store.clone());
        let stats = vectoriser(files)
            .vectorise(&ctx, &[], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats, VectoriseStats::default());
        assert!(store.upsert_batches().is_empty());
    }

    #[tokio::test]
    async fn cancellation_skips_remaining_files_and_removal() {
        let files = Arc::new(MemoryFiles::new());
        files.insert("/proj/a.rs", "fn a() {}");
        let store = Arc::new(InMemoryStore::new());
        let ctx = context(store.clone());
        let v = vectoriser(files);

        let stats = v
            .vectorise(&ctx, &[PathBuf::from("/proj/a.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats.added, 1);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = v.vectorise(&ctx, &[], &cancel).await.unwrap();
        assert_eq!(stats.removed, 0);
        let coll = store.get_collection(Path::new("/proj")).await.unwrap();
        assert_eq!(store.chunk_count(&coll), 1);
    }

    #[tokio::test]
    async fn invalid_chunk_size_aborts_before_any_store_call() {
        let files = Arc::new(MemoryFiles::new());
        files.insert("/proj/a.rs", "fn a() {}");
        let store = Arc::new(InMemoryStore::new());
        let mut ctx = context(store.clone());
        ctx.config.chunk_size = 0;
        let err = vectoriser(files)
            .vectorise(&ctx, &[PathBuf::from("/proj/a.rs")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err.source, VcError::Config(_)));
        assert_eq!(err.partial, VectoriseStats::default());
        assert!(store.get_collection(Path::new("/proj")).await.is_err());
    }
}
