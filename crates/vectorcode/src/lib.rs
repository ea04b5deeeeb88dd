//! Application layer for the `vectorcode` indexer.
//!
//! Wires the core pipelines to real infrastructure and exposes them three
//! ways: a CLI binary, an HTTP tool server, and this library surface.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`actions`] | Closed action enum and the dispatcher |
//! | [`cache`] | Per-project configuration and store cache |
//! | [`chroma`] | Chroma-compatible REST store gateway |
//! | [`config`] | Project configuration loading and merging |
//! | [`files`] | Local filesystem access |
//! | [`progress`] | Terminal and JSON progress reporting |
//! | [`query`] | Retrieval pipeline |
//! | [`registry`] | Collection listing |
//! | [`server`] | HTTP tool server |
//! | [`vectorise`] | Indexing pipeline |

pub mod actions;
pub mod cache;
pub mod chroma;
pub mod config;
pub mod files;
pub mod progress;
pub mod query;
pub mod registry;
pub mod server;
pub mod vectorise;
