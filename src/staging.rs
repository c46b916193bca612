use crate::constants::{STAGE_DIR_PREFIX, STAGE_LOCK_FILE};
use crate::errors::{AppError, AppResult};
use crate::models::SourceEntry;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Scratch area holding one private stage directory per processing attempt.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

/// Working files of one attempt: the staging copy of the source and the working archive.
///
/// Both live in a uniquely named directory that is deleted when the value is
/// released or dropped, so every exit path of an attempt cleans up after itself.
/// The directory's lock marker stays exclusively locked for the lifetime of the
/// value; a directory whose marker can be locked belongs to no live attempt.
#[derive(Debug)]
pub struct StagedEntry {
    // Field order matters: the lock is released after the directory is gone.
    dir: TempDir,
    _lock: File,
    copy: PathBuf,
    working_archive: PathBuf,
}

impl StagingArea {
    /// Creates the scratch directory if needed.
    pub fn open(root: &Path) -> AppResult<Self> {
        fs::create_dir_all(root).map_err(|e| {
            AppError::Io(format!(
                "Failed to create scratch directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes stage directories left behind by interrupted runs.
    ///
    /// A directory carrying the stage prefix is removed as soon as its lock marker
    /// can be locked, whatever its age; attempts of a concurrently running process
    /// hold theirs and survive. Directories without a marker (an attempt that died
    /// before creating it) are removed once older than `unmarked_max_age`.
    /// Failures are logged; the number of removed directories is returned.
    pub fn sweep_stale(&self, unmarked_max_age: Duration) -> usize {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    scratch_dir = %self.root.display(),
                    error = %e,
                    "Failed to list scratch directory, skipping stale sweep"
                );
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(STAGE_DIR_PREFIX) {
                continue;
            }
            let path = entry.path();

            // Held until the directory is gone.
            let _marker = match lock_marker(&path) {
                Marker::Abandoned(file) => Some(file),
                Marker::Live => {
                    debug!(stage_dir = %path.display(), "Stage directory in use, keeping it");
                    continue;
                }
                Marker::Missing => {
                    let age = entry
                        .metadata()
                        .and_then(|m| m.modified())
                        .ok()
                        .and_then(|modified| now.duration_since(modified).ok())
                        .unwrap_or_default();
                    if age < unmarked_max_age {
                        continue;
                    }
                    None
                }
            };

            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    removed += 1;
                    debug!(stage_dir = %path.display(), "Removed stale stage directory");
                }
                Err(e) => {
                    warn!(
                        stage_dir = %path.display(),
                        error = %e,
                        "Failed to remove stale stage directory"
                    );
                }
            }
        }

        if removed > 0 {
            info!(removed = removed, "Swept stale staging files");
        }
        removed
    }

    /// Copies the source into a fresh stage directory.
    ///
    /// The working archive path is reserved next to the copy but not created.
    ///
    /// # Errors
    ///
    /// Returns `Staging` if the stage directory cannot be created or the copy fails
    /// (missing source, permissions, disk full). Nothing is left in the scratch area
    /// in that case.
    pub fn acquire(&self, entry: &SourceEntry, artifact_suffix: &str) -> AppResult<StagedEntry> {
        let file_name = entry.path().file_name().ok_or_else(|| {
            AppError::Staging(format!(
                "Source has no file name: {}",
                entry.path().display()
            ))
        })?;

        let dir = tempfile::Builder::new()
            .prefix(STAGE_DIR_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| {
                AppError::Staging(format!(
                    "Failed to create stage directory in {}: {}",
                    self.root.display(),
                    e
                ))
            })?;

        let lock = create_marker(dir.path())?;

        let copy = dir.path().join(file_name);
        let mut archive_name = file_name.to_os_string();
        archive_name.push(artifact_suffix);
        let working_archive = dir.path().join(archive_name);

        fs::copy(entry.path(), &copy).map_err(|e| {
            AppError::Staging(format!(
                "Failed to copy {} to {}: {}",
                entry.path().display(),
                copy.display(),
                e
            ))
        })?;

        debug!(
            source = %entry.path().display(),
            staging_copy = %copy.display(),
            "Staged source file"
        );

        Ok(StagedEntry {
            dir,
            _lock: lock,
            copy,
            working_archive,
        })
    }
}

enum Marker {
    /// Marker present and locked by us: no attempt owns the directory
    Abandoned(File),
    /// Another attempt holds the marker
    Live,
    Missing,
}

fn lock_marker(stage_dir: &Path) -> Marker {
    let file = match OpenOptions::new()
        .read(true)
        .write(true)
        .open(stage_dir.join(STAGE_LOCK_FILE))
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Marker::Missing,
        Err(e) => {
            warn!(stage_dir = %stage_dir.display(), error = %e, "Failed to open stage lock");
            return Marker::Live;
        }
    };
    match file.try_lock_exclusive() {
        Ok(()) => Marker::Abandoned(file),
        Err(_) => Marker::Live,
    }
}

/// Creates and locks the marker of a fresh stage directory.
fn create_marker(stage_dir: &Path) -> AppResult<File> {
    let path = stage_dir.join(STAGE_LOCK_FILE);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&path)
        .and_then(|file| file.try_lock_exclusive().map(|()| file))
        .map_err(|e| {
            AppError::Staging(format!("Failed to lock stage marker {}: {}", path.display(), e))
        })?;
    Ok(file)
}

impl StagedEntry {
    pub fn copy_path(&self) -> &Path {
        &self.copy
    }

    pub fn working_archive(&self) -> &Path {
        &self.working_archive
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Deletes the staging copy and working archive, reporting failures.
    pub fn release(self) -> AppResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            AppError::Staging(format!(
                "Failed to remove stage directory {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StagingArea, SourceEntry) {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("data/a.parquet");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"PAR1 body PAR1").unwrap();
        let area = StagingArea::open(&temp_dir.path().join("scratch")).unwrap();
        (temp_dir, area, SourceEntry::file(source))
    }

    fn make_stage_dir(area: &StagingArea, name: &str, with_marker: bool) -> PathBuf {
        let dir = area.root().join(format!("{STAGE_DIR_PREFIX}{name}"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.parquet"), b"stale").unwrap();
        if with_marker {
            fs::write(dir.join(STAGE_LOCK_FILE), b"").unwrap();
        }
        dir
    }

    fn stage_dirs(area: &StagingArea) -> usize {
        fs::read_dir(area.root()).unwrap().count()
    }

    #[test]
    fn acquire_copies_source_and_release_removes_everything() {
        let (_temp_dir, area, entry) = setup();

        let staged = area.acquire(&entry, "-context.zip").unwrap();
        assert_eq!(fs::read(staged.copy_path()).unwrap(), b"PAR1 body PAR1");
        assert!(staged.copy_path().ends_with("a.parquet"));
        assert!(staged.working_archive().ends_with("a.parquet-context.zip"));
        assert!(!staged.working_archive().exists());

        fs::write(staged.working_archive(), b"partial").unwrap();
        let dir = staged.dir().to_path_buf();
        staged.release().unwrap();

        assert!(!dir.exists());
        assert_eq!(stage_dirs(&area), 0);
    }

    #[test]
    fn drop_releases_stage_directory() {
        let (_temp_dir, area, entry) = setup();

        {
            let staged = area.acquire(&entry, "-context.zip").unwrap();
            fs::write(staged.working_archive(), b"partial").unwrap();
        }

        assert_eq!(stage_dirs(&area), 0);
    }

    #[test]
    fn concurrent_attempts_get_distinct_directories() {
        let (_temp_dir, area, entry) = setup();

        let first = area.acquire(&entry, "-context.zip").unwrap();
        let second = area.acquire(&entry, "-context.zip").unwrap();
        assert_ne!(first.copy_path(), second.copy_path());
    }

    #[test]
    fn acquire_missing_source_is_staging_error_without_residue() {
        let (temp_dir, area, _) = setup();
        let missing = SourceEntry::file(temp_dir.path().join("missing.parquet"));

        let err = area.acquire(&missing, "-context.zip").unwrap_err();
        assert!(matches!(err, AppError::Staging(_)));
        assert_eq!(stage_dirs(&area), 0);
    }

    #[test]
    fn sweep_removes_unmarked_directories_by_age_only() {
        let (_temp_dir, area, _) = setup();
        make_stage_dir(&area, "leftover", false);
        fs::create_dir_all(area.root().join("unrelated")).unwrap();

        assert_eq!(area.sweep_stale(Duration::from_secs(3600)), 0);
        assert_eq!(area.sweep_stale(Duration::ZERO), 1);
        assert!(area.root().join("unrelated").exists());
    }

    #[test]
    fn sweep_removes_abandoned_directory_regardless_of_age() {
        let (_temp_dir, area, _) = setup();
        let crashed = make_stage_dir(&area, "crashed", true);

        assert_eq!(area.sweep_stale(Duration::from_secs(24 * 60 * 60)), 1);
        assert!(!crashed.exists());
    }

    #[test]
    fn sweep_keeps_directories_of_live_attempts() {
        let (_temp_dir, area, entry) = setup();
        let staged = area.acquire(&entry, "-context.zip").unwrap();
        assert!(staged.dir().join(STAGE_LOCK_FILE).exists());

        assert_eq!(area.sweep_stale(Duration::ZERO), 0);
        assert!(staged.copy_path().exists());

        staged.release().unwrap();
        assert_eq!(stage_dirs(&area), 0);
    }
}
