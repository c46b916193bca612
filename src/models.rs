use crate::errors::AppError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A candidate discovered by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl SourceEntry {
    pub fn new(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            is_dir,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name as UTF-8, lossily converted.
    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// What happened to one source entry.
#[derive(Debug)]
pub enum EntryOutcome {
    /// Artifact written and committed at its final path
    Published { records: u64, bytes: u64 },
    /// Artifact already existed (before the attempt or committed concurrently)
    Skipped,
    /// Attempt rolled back
    Failed(AppError),
}

/// Aggregated result of a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: u64,
    pub published_bytes: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::Published { records, bytes } => {
                self.published += 1;
                self.records += records;
                self.published_bytes += bytes;
            }
            EntryOutcome::Skipped => self.skipped += 1,
            EntryOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Adds the counters of `other`; elapsed time is owned by the caller.
    pub fn merge(mut self, other: RunSummary) -> RunSummary {
        self.published += other.published;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.records += other.records;
        self.published_bytes += other.published_bytes;
        self
    }

    pub fn total(&self) -> usize {
        self.published + self.skipped + self.failed
    }
}
