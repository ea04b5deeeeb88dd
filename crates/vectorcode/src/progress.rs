//! Progress reporters for the CLI.
//!
//! Interactive terminals get human-readable lines on stderr; pipes get
//! nothing unless JSON events are asked for explicitly, which keeps
//! stdout clean for the command's actual output.

use std::sync::Arc;

use clap::ValueEnum;

use vectorcode_core::progress::{NoProgress, ProgressEvent, ProgressReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProgressMode {
    /// Stderr lines when attached to a terminal, silent otherwise.
    #[default]
    Auto,
    Never,
    /// One JSON event per line on stderr.
    Json,
}

struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Begin { task, total } => match total {
                Some(total) => eprintln!("{task}: 0/{total}"),
                None => eprintln!("{task}: started"),
            },
            ProgressEvent::Advance { task, done, total } => {
                eprintln!("{task}: {done}/{total}");
            }
            ProgressEvent::End { task } => eprintln!("{task}: done"),
        }
    }
}

struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            eprintln!("{line}");
        }
    }
}

pub fn reporter_for(mode: ProgressMode) -> Arc<dyn ProgressReporter> {
    match mode {
        ProgressMode::Auto => {
            if atty::is(atty::Stream::Stderr) {
                Arc::new(StderrProgress)
            } else {
                Arc::new(NoProgress)
            }
        }
        ProgressMode::Never => Arc::new(NoProgress),
        ProgressMode::Json => Arc::new(JsonProgress),
    }
}
