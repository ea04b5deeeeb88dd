//! Progress reporting side-channel.
//!
//! Long operations emit begin/advance/end events through an injected
//! [`ProgressReporter`] so the pipelines stay host-agnostic: the editor
//! front-end forwards events over its protocol, the CLI prints them to
//! stderr, and tests use [`NoProgress`]. Events are advisory and never
//! part of an operation's return value.

use serde::Serialize;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Operation started. `total` is the number of work items when known.
    Begin { task: String, total: Option<u64> },
    /// `done` of `total` items processed.
    Advance { task: String, done: u64, total: u64 },
    /// Operation finished (successfully or not).
    End { task: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter used when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}
