//! Action dispatch.
//!
//! Every entry point (CLI, HTTP) reduces to one of a closed set of
//! actions, dispatched through a shared [`AppContext`]. Unknown action
//! names are rejected up front; there is no dynamic action lookup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use vectorcode_core::embedding::Embedder;
use vectorcode_core::error::VcError;
use vectorcode_core::fs::FileAccess;
use vectorcode_core::models::{CollectionDescriptor, QueryResult, VectoriseStats};
use vectorcode_core::progress::ProgressReporter;
use vectorcode_core::store::StoreConnector;

use crate::cache::ConfigCache;
use crate::config::ProjectConfig;
use crate::query::QueryPipeline;
use crate::registry;
use crate::vectorise::{Vectoriser, VectoriseError};

fn default_n_results() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryParams {
    pub messages: Vec<String>,
    #[serde(default = "default_n_results")]
    pub n_results: usize,
    #[serde(default)]
    pub project_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectoriseParams {
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub project_root: Option<PathBuf>,
}

/// The closed set of operations this tool performs.
#[derive(Debug, Clone)]
pub enum Action {
    Query(QueryParams),
    Vectorise(VectoriseParams),
    Ls,
}

impl Action {
    pub const NAMES: &'static [&'static str] = &["query", "vectorise", "ls"];

    /// Build an action from its wire name and JSON parameters.
    pub fn from_name(name: &str, params: serde_json::Value) -> Result<Self, VcError> {
        let invalid = |e: serde_json::Error| VcError::Config(format!("{name}: {e}"));
        match name {
            "query" => Ok(Self::Query(serde_json::from_value(params).map_err(invalid)?)),
            "vectorise" => Ok(Self::Vectorise(
                serde_json::from_value(params).map_err(invalid)?,
            )),
            "ls" => Ok(Self::Ls),
            other => Err(VcError::UnsupportedAction(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Query(_) => "query",
            Self::Vectorise(_) => "vectorise",
            Self::Ls => "ls",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionOutput {
    Query { results: Vec<QueryResult> },
    Vectorise(VectoriseStats),
    Ls { collections: Vec<CollectionDescriptor> },
}

/// A failed dispatch. An aborted vectorise run keeps its accumulated
/// counts; everything else is a plain taxonomy error.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Action(#[from] VcError),
    #[error(transparent)]
    Vectorise(#[from] VectoriseError),
}

impl DispatchError {
    /// The taxonomy error behind this failure.
    pub fn cause(&self) -> &VcError {
        match self {
            Self::Action(e) => e,
            Self::Vectorise(e) => &e.source,
        }
    }

    /// Counts accumulated before an aborted vectorise run.
    pub fn partial(&self) -> Option<VectoriseStats> {
        match self {
            Self::Vectorise(e) => Some(e.partial),
            Self::Action(_) => None,
        }
    }
}

/// Shared wiring for every entry point.
pub struct AppContext {
    pub cache: ConfigCache,
    pub connector: Arc<dyn StoreConnector>,
    pub files: Arc<dyn FileAccess>,
    pub embedder: Arc<dyn Embedder>,
    pub progress: Arc<dyn ProgressReporter>,
    pub base: ProjectConfig,
    pub default_project_root: PathBuf,
}

impl AppContext {
    pub async fn dispatch(
        &self,
        action: Action,
        cancel: &CancellationToken,
    ) -> Result<ActionOutput, DispatchError> {
        match action {
            Action::Query(params) => {
                let root = self.resolve_root(params.project_root.as_deref()).await?;
                let ctx = self.cache.get_or_load(&root).await?;
                let pipeline = QueryPipeline::new(self.files.clone(), self.embedder.clone());
                let results = pipeline
                    .query(&ctx, &params.messages, params.n_results)
                    .await?;
                Ok(ActionOutput::Query { results })
            }
            Action::Vectorise(params) => {
                let root = self.resolve_root(params.project_root.as_deref()).await?;
                let ctx = self.cache.get_or_load(&root).await?;
                let v = Vectoriser::new(
                    self.files.clone(),
                    self.embedder.clone(),
                    self.progress.clone(),
                );
                let stats = v.vectorise(&ctx, &params.paths, cancel).await?;
                Ok(ActionOutput::Vectorise(stats))
            }
            Action::Ls => {
                // Listing spans projects, so it uses the base configuration
                // rather than any project's own.
                let store = self
                    .connector
                    .connect(&self.base.host, self.base.port)
                    .await?;
                let collections = registry::list_collections(&store).await?;
                Ok(ActionOutput::Ls { collections })
            }
        }
    }

    /// Canonical project root for an action, falling back to the root the
    /// process was started with.
    async fn resolve_root(&self, requested: Option<&Path>) -> Result<PathBuf, VcError> {
        let raw = requested.unwrap_or(&self.default_project_root);
        let root = self.files.canonicalize(raw).await?;
        if !self.files.is_dir(&root).await {
            return Err(VcError::InvalidProjectRoot(root));
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_action_names_are_rejected() {
        let err = Action::from_name("invalid_action", json!({})).unwrap_err();
        match err {
            VcError::UnsupportedAction(name) => assert_eq!(name, "invalid_action"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn query_defaults_to_five_results() {
        let action = Action::from_name("query", json!({ "messages": ["hello"] })).unwrap();
        match action {
            Action::Query(params) => {
                assert_eq!(params.n_results, 5);
                assert!(params.project_root.is_none());
            }
            other => panic!("unexpected action: {}", other.name()),
        }
    }

    #[test]
    fn malformed_params_are_config_errors() {
        let err = Action::from_name("vectorise", json!({ "paths": "not-a-list" })).unwrap_err();
        assert!(matches!(err, VcError::Config(_)));
    }
}
