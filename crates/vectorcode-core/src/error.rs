//! The closed error taxonomy for VectorCode operations.
//!
//! Pipelines and gateways return these variants directly so front-ends can
//! map them to protocol-specific error codes without string matching.
//! Per-file failures ([`VcError::FileRead`]) are recovered locally by the
//! pipelines; connectivity failures ([`VcError::StoreUnavailable`]) always
//! abort the operation that hit them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcError {
    /// Malformed project config, malformed exclude spec, or an invalid
    /// configuration value (e.g. a non-positive chunk size).
    #[error("configuration error: {0}")]
    Config(String),

    /// The backing vector store did not answer a probe or dropped the
    /// connection. Never cached as success; retry policy is the caller's.
    #[error("vector store at {host}:{port} is unreachable")]
    StoreUnavailable { host: String, port: u16 },

    /// A collection could not be obtained or created for a project.
    #[error(
        "failed to access the collection at {project_root}: {reason}. \
         Use the `ls` action to list valid project roots"
    )]
    CollectionAccess {
        project_root: PathBuf,
        reason: String,
    },

    /// The supplied root is not a directory or has no known collection.
    #[error(
        "{0} is not a valid project root. \
         Use the `ls` action to list valid project roots"
    )]
    InvalidProjectRoot(PathBuf),

    /// A single file could not be read. Pipelines skip the file and keep
    /// going; this variant only surfaces when the read was mandatory.
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A front-end asked for a verb the dispatcher does not know.
    #[error("unsupported action: {0:?}")]
    UnsupportedAction(String),

    /// A store failure not covered by a more specific variant.
    #[error("vector store error: {0}")]
    Store(String),
}

impl VcError {
    /// True when the underlying cause is a missing file rather than, say,
    /// a permissions problem. Used to distinguish "deleted from disk" from
    /// "temporarily unreadable" during vectorization.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VcError::FileRead { source, .. } if source.kind() == io::ErrorKind::NotFound
        )
    }
}
