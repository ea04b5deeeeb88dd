//! Per-project context cache.
//!
//! Resolving a project root means loading its configuration and connecting
//! to the store it names, including a reachability probe. Both are cached
//! per root, and concurrent first requests for the same root share a
//! single resolution instead of racing. A failed resolution caches
//! nothing, so the next request retries from scratch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use vectorcode_core::error::VcError;
use vectorcode_core::fs::FileAccess;
use vectorcode_core::store::{StoreConnector, VectorStore};

use crate::config::{self, ProjectConfig};

/// Everything resolved for one project root.
pub struct ProjectContext {
    pub project_root: PathBuf,
    pub config: ProjectConfig,
    pub store: Arc<dyn VectorStore>,
}

type Slot = Arc<OnceCell<Arc<ProjectContext>>>;

pub struct ConfigCache {
    files: Arc<dyn FileAccess>,
    connector: Arc<dyn StoreConnector>,
    entries: Mutex<HashMap<PathBuf, Slot>>,
}

impl ConfigCache {
    pub fn new(files: Arc<dyn FileAccess>, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            files,
            connector,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a project root, reusing a cached context when one exists.
    pub async fn get_or_load(&self, project_root: &Path) -> Result<Arc<ProjectContext>, VcError> {
        let slot = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(project_root.to_path_buf())
                .or_default()
                .clone()
        };
        let result = slot
            .get_or_try_init(|| self.resolve(project_root))
            .await
            .cloned();
        if result.is_err() {
            // Drop the slot only if it is still the one this call used, so
            // a resolution started after this failure is left alone.
            let mut entries = self.entries.lock().await;
            if let Some(current) = entries.get(project_root) {
                if Arc::ptr_eq(current, &slot) && current.get().is_none() {
                    entries.remove(project_root);
                }
            }
        }
        result
    }

    /// Forget a cached context so the next request reloads it.
    pub async fn invalidate(&self, project_root: &Path) {
        self.entries.lock().await.remove(project_root);
    }

    async fn resolve(&self, project_root: &Path) -> Result<Arc<ProjectContext>, VcError> {
        let config = config::load_project_config(self.files.as_ref(), project_root).await?;
        debug!(root = %project_root.display(), host = %config.host, port = config.port,
            "resolving project context");
        let store = self.connector.connect(&config.host, config.port).await?;
        Ok(Arc::new(ProjectContext {
            project_root: project_root.to_path_buf(),
            config,
            store,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vectorcode_core::fs::MemoryFiles;
    use vectorcode_core::store::memory::{InMemoryStore, MemoryConnector};

    fn cache_with_connector() -> (Arc<ConfigCache>, Arc<MemoryConnector>) {
        let files = Arc::new(MemoryFiles::new());
        let connector = Arc::new(MemoryConnector::new(Arc::new(InMemoryStore::new())));
        let cache = Arc::new(ConfigCache::new(files, connector.clone()));
        (cache, connector)
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_resolution() {
        let (cache, connector) = cache_with_connector();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_load(Path::new("/proj")).await
            }));
        }
        for handle in handles {
            let ctx = handle.await.unwrap().unwrap();
            assert_eq!(ctx.project_root, PathBuf::from("/proj"));
        }
        assert_eq!(connector.probe_count(), 1);
    }

    #[tokio::test]
    async fn failed_resolution_is_not_cached() {
        let (cache, connector) = cache_with_connector();
        connector.set_available(false);
        let err = cache.get_or_load(Path::new("/proj")).await.err().unwrap();
        assert!(matches!(err, VcError::StoreUnavailable { .. }));

        connector.set_available(true);
        let ctx = cache.get_or_load(Path::new("/proj")).await.unwrap();
        assert_eq!(ctx.config.port, 8000);
        assert_eq!(connector.probe_count(), 2);
    }

    #[tokio::test]
    async fn second_load_reuses_cached_context() {
        let (cache, connector) = cache_with_connector();
        let first = cache.get_or_load(Path::new("/proj")).await.unwrap();
        let second = cache.get_or_load(Path::new("/proj")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.probe_count(), 1);

        cache.invalidate(Path::new("/proj")).await;
        cache.get_or_load(Path::new("/proj")).await.unwrap();
        assert_eq!(connector.probe_count(), 2);
    }
}
