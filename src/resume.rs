use crate::models::SourceEntry;
use std::path::{Path, PathBuf};

/// Decision of the resume guard for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeDecision {
    /// An artifact is already published at the contained path
    Skip(PathBuf),
    /// No artifact yet; the contained path is where it will be published
    Proceed(PathBuf),
}

/// Path of the published artifact: the source name plus `artifact_suffix`, next to the source.
pub fn artifact_path(source: &Path, artifact_suffix: &str) -> PathBuf {
    let mut name = source.file_name().unwrap_or_default().to_os_string();
    name.push(artifact_suffix);
    source.with_file_name(name)
}

/// Checks whether `entry` has already been converted. Never touches the filesystem
/// beyond a metadata lookup.
pub fn check(entry: &SourceEntry, artifact_suffix: &str) -> ResumeDecision {
    let destination = artifact_path(entry.path(), artifact_suffix);
    if destination.exists() {
        ResumeDecision::Skip(destination)
    } else {
        ResumeDecision::Proceed(destination)
    }
}
