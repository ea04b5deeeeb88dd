//! Retrieval pipeline.
//!
//! A query embeds the caller's messages as one text, over-fetches raw
//! chunk hits from the store, collapses them to one hit per file, and
//! returns the closest files with their current on-disk content. Files
//! that have vanished since indexing still come back, with no content.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use vectorcode_core::embedding::Embedder;
use vectorcode_core::error::VcError;
use vectorcode_core::fs::FileAccess;
use vectorcode_core::models::{QueryResult, RawHit};

use crate::cache::ProjectContext;

pub struct QueryPipeline {
    files: Arc<dyn FileAccess>,
    embedder: Arc<dyn Embedder>,
}

impl QueryPipeline {
    pub fn new(files: Arc<dyn FileAccess>, embedder: Arc<dyn Embedder>) -> Self {
        Self { files, embedder }
    }

    /// Return up to `n_results` files ranked by ascending distance.
    pub async fn query(
        &self,
        ctx: &ProjectContext,
        messages: &[String],
        n_results: usize,
    ) -> Result<Vec<QueryResult>, VcError> {
        if messages.is_empty() || n_results == 0 {
            return Ok(Vec::new());
        }
        let collection = ctx.store.get_collection(&ctx.project_root).await?;

        let text = messages.join("\n");
        let embeddings = self.embedder.embed(&[text]).await?;
        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| VcError::Store("embedder returned no vectors".to_string()))?;

        let fetch = n_results.saturating_mul(ctx.config.query_multiplier);
        let raw = ctx.store.query(&collection, &embedding, fetch).await?;
        debug!(raw = raw.len(), fetch, "raw hits fetched");

        let mut deduped = dedup_by_path(raw);
        deduped.truncate(n_results);

        let want_content = ctx.config.includes_document();
        let mut results = Vec::with_capacity(deduped.len());
        for (rank, (path, distance)) in deduped.into_iter().enumerate() {
            let content = if want_content {
                let full = ctx.project_root.join(&path);
                self.files.read_to_string(&full).await.ok()
            } else {
                None
            };
            results.push(QueryResult {
                path,
                content,
                distance,
                rank,
            });
        }
        Ok(results)
    }
}

/// Collapse raw chunk hits to one entry per file, keeping each file's
/// smallest distance, sorted ascending. Hits without a path are dropped.
/// Files at equal distance keep their first-seen relative order.
pub fn dedup_by_path(hits: Vec<RawHit>) -> Vec<(PathBuf, f32)> {
    let mut best: HashMap<PathBuf, usize> = HashMap::new();
    let mut ordered: Vec<(PathBuf, f32)> = Vec::new();
    for hit in hits {
        let Some(path) = hit.path else { continue };
        match best.get(&path) {
            Some(&slot) => {
                if hit.distance < ordered[slot].1 {
                    ordered[slot].1 = hit.distance;
                }
            }
            None => {
                best.insert(path.clone(), ordered.len());
                ordered.push((path, hit.distance));
            }
        }
    }
    ordered.sort_by(|a, b| a.1.total_cmp(&b.1));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(path: Option<&str>, distance: f32) -> RawHit {
        RawHit {
            chunk_id: format!("{path:?}-{distance}"),
            path: path.map(PathBuf::from),
            distance,
        }
    }

    #[test]
    fn keeps_lowest_distance_per_path() {
        let out = dedup_by_path(vec![
            hit(Some("a.rs"), 0.1),
            hit(Some("b.rs"), 0.2),
            hit(Some("a.rs"), 0.15),
        ]);
        assert_eq!(
            out,
            vec![(PathBuf::from("a.rs"), 0.1), (PathBuf::from("b.rs"), 0.2)]
        );
    }

    #[test]
    fn drops_pathless_hits() {
        let out = dedup_by_path(vec![hit(None, 0.01), hit(Some("a.rs"), 0.5)]);
        assert_eq!(out, vec![(PathBuf::from("a.rs"), 0.5)]);
    }

    #[test]
    fn later_lower_distance_wins_and_order_is_ascending() {
        let out = dedup_by_path(vec![
            hit(Some("a.rs"), 0.9),
            hit(Some("b.rs"), 0.3),
            hit(Some("a.rs"), 0.1),
        ]);
        assert_eq!(
            out,
            vec![(PathBuf::from("a.rs"), 0.1), (PathBuf::from("b.rs"), 0.3)]
        );
    }

    #[test]
    fn equal_distances_keep_first_seen_order() {
        let out = dedup_by_path(vec![
            hit(Some("b.rs"), 0.5),
            hit(Some("a.rs"), 0.5),
        ]);
        assert_eq!(out[0].0, PathBuf::from("b.rs"));
        assert_eq!(out[1].0, PathBuf::from("a.rs"));
    }
}
