//! # VectorCode Core
//!
//! Store-agnostic logic for VectorCode: data models, the content chunker,
//! the exclusion filter, content-fingerprint change detection, and the
//! capability traits that form the system's seams ([`store::VectorStore`],
//! [`embedding::Embedder`], [`fs::FileAccess`], [`progress::ProgressReporter`]).
//!
//! This crate contains no tokio, no network, and no disk I/O. Everything
//! that touches the outside world is behind an async trait, so the
//! pipelines in the `vectorcode` application crate are testable with the
//! in-memory implementations shipped here ([`store::memory::InMemoryStore`],
//! [`fs::MemoryFiles`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Chunks, file records, query results, collection descriptors |
//! | [`chunk`] | Sliding-window text chunking with overlap |
//! | [`exclude`] | Ignore-style glob exclusion |
//! | [`fingerprint`] | SHA-256 content fingerprints and change classification |
//! | [`embedding`] | Embedder trait, cosine similarity, feature-hash embedder |
//! | [`store`] | Vector store gateway trait and in-memory implementation |
//! | [`fs`] | File access trait and in-memory fake |
//! | [`progress`] | Progress reporting side-channel |
//! | [`error`] | The closed error taxonomy |

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod exclude;
pub mod fingerprint;
pub mod fs;
pub mod models;
pub mod progress;
pub mod store;
