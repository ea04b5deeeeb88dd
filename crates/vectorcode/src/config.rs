//! Project configuration.
//!
//! Configuration is layered: compiled defaults, then the user-level file
//! under the platform config directory, then the project-level file at
//! `<root>/.vectorcode/config.json`. Later layers override earlier ones
//! field by field; absent fields leave the previous value in place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use vectorcode_core::chunk;
use vectorcode_core::error::VcError;
use vectorcode_core::exclude::ExclusionFilter;
use vectorcode_core::fs::FileAccess;

pub const CONFIG_DIR: &str = ".vectorcode";
pub const CONFIG_FILE: &str = "config.json";
pub const EXCLUDE_FILE: &str = "vectorcode.exclude";

/// What the query pipeline should return for each hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryInclude {
    Path,
    Document,
}

/// Fully resolved configuration for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectConfig {
    pub host: String,
    pub port: u16,
    pub embedding_function: String,
    pub embedding_params: HashMap<String, serde_json::Value>,
    pub chunk_size: i64,
    pub overlap_ratio: f64,
    pub query_multiplier: usize,
    pub include: Vec<QueryInclude>,
    /// Ignore globs applied in addition to the exclude spec file.
    pub exclude_patterns: Vec<String>,
    pub db_settings: HashMap<String, serde_json::Value>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            embedding_function: "SentenceTransformerEmbeddingFunction".to_string(),
            embedding_params: HashMap::new(),
            chunk_size: 2500,
            overlap_ratio: 0.2,
            query_multiplier: 10,
            include: vec![QueryInclude::Path, QueryInclude::Document],
            exclude_patterns: Vec::new(),
            db_settings: HashMap::new(),
        }
    }
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), VcError> {
        chunk::validate_params(self.chunk_size, self.overlap_ratio)?;
        if self.query_multiplier == 0 {
            return Err(VcError::Config(
                "query_multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn includes_document(&self) -> bool {
        self.include.contains(&QueryInclude::Document)
    }
}

/// One configuration file's contents. Every field is optional so a file
/// only overrides what it names. `query_multipler` is accepted as a
/// historical misspelling of `query_multiplier`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub embedding_function: Option<String>,
    pub embedding_params: Option<HashMap<String, serde_json::Value>>,
    pub chunk_size: Option<i64>,
    pub overlap_ratio: Option<f64>,
    #[serde(alias = "query_multipler")]
    pub query_multiplier: Option<usize>,
    pub include: Option<Vec<QueryInclude>>,
    pub exclude_patterns: Option<Vec<String>>,
    pub db_settings: Option<HashMap<String, serde_json::Value>>,
}

impl ConfigOverrides {
    pub fn apply(self, base: &mut ProjectConfig) {
        if let Some(host) = self.host {
            base.host = host;
        }
        if let Some(port) = self.port {
            base.port = port;
        }
        if let Some(f) = self.embedding_function {
            base.embedding_function = f;
        }
        if let Some(p) = self.embedding_params {
            base.embedding_params = p;
        }
        if let Some(s) = self.chunk_size {
            base.chunk_size = s;
        }
        if let Some(r) = self.overlap_ratio {
            base.overlap_ratio = r;
        }
        if let Some(m) = self.query_multiplier {
            base.query_multiplier = m;
        }
        if let Some(i) = self.include {
            base.include = i;
        }
        if let Some(e) = self.exclude_patterns {
            base.exclude_patterns = e;
        }
        if let Some(d) = self.db_settings {
            base.db_settings = d;
        }
    }
}

/// Path of the user-level configuration file, if a platform config
/// directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vectorcode").join(CONFIG_FILE))
}

pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(CONFIG_FILE)
}

pub fn exclude_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(EXCLUDE_FILE)
}

async fn apply_file(
    files: &dyn FileAccess,
    path: &Path,
    config: &mut ProjectConfig,
) -> Result<(), VcError> {
    if !files.is_file(path).await {
        return Ok(());
    }
    let raw = files.read_to_string(path).await?;
    let overrides: ConfigOverrides = serde_json::from_str(&raw)
        .map_err(|e| VcError::Config(format!("{}: {e}", path.display())))?;
    overrides.apply(config);
    Ok(())
}

/// Resolve the effective configuration for a project root. A missing file
/// at any layer is fine; a present but malformed one is a configuration
/// error.
pub async fn load_project_config(
    files: &dyn FileAccess,
    project_root: &Path,
) -> Result<ProjectConfig, VcError> {
    let mut config = ProjectConfig::default();
    if let Some(user_path) = user_config_path() {
        apply_file(files, &user_path, &mut config).await?;
    }
    apply_file(files, &project_config_path(project_root), &mut config).await?;
    config.validate()?;
    Ok(config)
}

/// Load the project's exclusion patterns: the exclude spec file plus any
/// patterns configured inline. A missing or unreadable file contributes
/// nothing.
pub async fn load_exclusions(
    files: &dyn FileAccess,
    config: &ProjectConfig,
    project_root: &Path,
) -> ExclusionFilter {
    let mut patterns = config.exclude_patterns.clone();
    let path = exclude_path(project_root);
    if let Ok(spec) = files.read_to_string(&path).await {
        patterns.extend(spec.lines().map(str::to_string));
    }
    ExclusionFilter::new(&patterns)
}
