//! Collection listing.
//!
//! Collections record their project root in metadata. Entries written by
//! other tools, or with missing or malformed metadata, are skipped rather
//! than failing the listing.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use vectorcode_core::error::VcError;
use vectorcode_core::models::CollectionDescriptor;
use vectorcode_core::store::{VectorStore, METADATA_PATH_KEY};

/// Collections that belong to this tool, newest metadata as stored.
pub async fn list_collections(
    store: &Arc<dyn VectorStore>,
) -> Result<Vec<CollectionDescriptor>, VcError> {
    let mut descriptors = Vec::new();
    for info in store.list_collections().await? {
        let Some(metadata) = info.metadata else {
            debug!(name = %info.name, "skipping collection without metadata");
            continue;
        };
        let Some(root) = metadata.get(METADATA_PATH_KEY).and_then(|v| v.as_str()) else {
            debug!(name = %info.name, "skipping collection without a recorded root");
            continue;
        };
        descriptors.push(CollectionDescriptor {
            project_root: PathBuf::from(root),
            metadata,
        });
    }
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;
    use vectorcode_core::store::memory::InMemoryStore;

    #[tokio::test]
    async fn skips_collections_without_usable_metadata() {
        let store = InMemoryStore::new();
        store
            .get_or_create_collection(Path::new("/a"), json!({ "path": "/a" }))
            .await
            .unwrap();
        store
            .get_or_create_collection(Path::new("/b"), json!({ "owner": "other-tool" }))
            .await
            .unwrap();
        store
            .get_or_create_collection(Path::new("/c"), serde_json::Value::Null)
            .await
            .unwrap();

        let store: Arc<dyn VectorStore> = Arc::new(store);
        let listed = list_collections(&store).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].project_root, PathBuf::from("/a"));
    }
}
