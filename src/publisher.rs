use crate::archive::FinishedArchive;
use crate::constants::PENDING_SUFFIX;
use crate::errors::{AppError, AppResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The artifact is now visible at the final path
    Committed,
    /// Another attempt committed to the final path first; this copy was discarded
    AlreadyPublished,
}

/// Makes a finished archive visible at `final_path`.
///
/// The archive is hard-linked to `final_path`, which fails if the name exists.
/// When linking is impossible (scratch area on another filesystem) the bytes are
/// copied into a hidden, locked `.part` file in the destination directory, synced,
/// and that file is linked into place without overwriting. Either way observers of
/// `final_path` see nothing or a complete archive, and concurrent attempts on the
/// same destination publish exactly once.
///
/// # Errors
///
/// Returns `Publish` for any failure other than losing the race. The temporary
/// file in the destination directory is removed in every failing case.
pub fn commit(archive: &FinishedArchive, final_path: &Path) -> AppResult<PublishOutcome> {
    match fs::hard_link(&archive.path, final_path) {
        Ok(()) => {
            debug!(artifact = %final_path.display(), "Committed artifact");
            discard_working_archive(archive);
            Ok(PublishOutcome::Committed)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            lost_race(final_path);
            Ok(PublishOutcome::AlreadyPublished)
        }
        Err(e) => {
            debug!(
                archive = %archive.path.display(),
                artifact = %final_path.display(),
                error = %e,
                "Hard link failed, copying through a temporary file"
            );
            commit_by_copy(archive, final_path)
        }
    }
}

fn commit_by_copy(archive: &FinishedArchive, final_path: &Path) -> AppResult<PublishOutcome> {
    let dest_dir = destination_dir(final_path);
    let hidden_prefix = format!(
        ".{}.",
        final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );

    let mut pending = tempfile::Builder::new()
        .prefix(&hidden_prefix)
        .suffix(PENDING_SUFFIX)
        .tempfile_in(dest_dir)
        .map_err(|e| publish_err("reserve temporary file in", dest_dir, &e))?;
    // Stays locked until the persisted handle is dropped, which marks it live for sweeps.
    pending
        .as_file()
        .try_lock_exclusive()
        .map_err(|e| publish_err("lock", pending.path(), &e))?;

    let mut source =
        File::open(&archive.path).map_err(|e| publish_err("open", &archive.path, &e))?;
    io::copy(&mut source, pending.as_file_mut())
        .map_err(|e| publish_err("copy archive into", pending.path(), &e))?;
    // Temporary files are created owner-only; match a linked artifact instead.
    source
        .metadata()
        .and_then(|m| pending.as_file().set_permissions(m.permissions()))
        .map_err(|e| publish_err("set permissions of", pending.path(), &e))?;
    pending
        .as_file()
        .sync_all()
        .map_err(|e| publish_err("sync", pending.path(), &e))?;

    match pending.persist_noclobber(final_path) {
        Ok(_) => {
            debug!(artifact = %final_path.display(), "Committed artifact");
            discard_working_archive(archive);
            Ok(PublishOutcome::Committed)
        }
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            lost_race(final_path);
            Ok(PublishOutcome::AlreadyPublished)
        }
        Err(e) => Err(publish_err("publish", final_path, &e.error)),
    }
}

/// Removes `.part` files of interrupted commits from `dir`.
///
/// Only hidden files carrying `artifact_suffix` and the pending suffix are
/// considered, and only those nobody holds locked. Failures are logged; the number
/// of removed files is returned.
pub fn sweep_pending(dir: &Path, artifact_suffix: &str) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to list directory for leftovers");
            return 0;
        }
    };

    let marker = format!("{artifact_suffix}.");
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !(name.starts_with('.') && name.ends_with(PENDING_SUFFIX) && name.contains(&marker)) {
            continue;
        }
        let path = entry.path();
        let file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open leftover temporary file");
                continue;
            }
        };
        if file.try_lock_exclusive().is_err() {
            debug!(path = %path.display(), "Temporary file in use, keeping it");
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove leftover temporary file")
            }
        }
    }

    if removed > 0 {
        info!(dir = %dir.display(), removed = removed, "Removed leftover temporary files");
    }
    removed
}

/// Directory an artifact is published into.
pub fn destination_dir(final_path: &Path) -> &Path {
    final_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn lost_race(final_path: &Path) {
    debug!(
        artifact = %final_path.display(),
        "Artifact committed concurrently, discarding duplicate"
    );
}

// The stage directory is released right after, so a failure here only delays removal.
fn discard_working_archive(archive: &FinishedArchive) {
    if let Err(e) = fs::remove_file(&archive.path) {
        warn!(archive = %archive.path.display(), error = %e, "Failed to remove working archive");
    }
}

fn publish_err(action: &str, path: &Path, e: &io::Error) -> AppError {
    AppError::Publish(format!("Failed to {action} {}: {e}", path.display()))
}
