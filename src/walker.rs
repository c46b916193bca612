use crate::errors::{AppError, AppResult};
use crate::models::SourceEntry;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, FilterEntry, WalkDir};

type EntryFilter = Box<dyn FnMut(&DirEntry) -> bool + Send>;

/// Lazy depth-first sequence of source files under a root.
///
/// Wraps `walkdir`, which keeps its own stack of open directories, so deep
/// trees do not grow the call stack. Symbolic links are not followed and every
/// path is yielded at most once.
///
/// Listing failures are returned as `AppError::Traversal`. The root itself
/// failing is always returned; failures in subdirectories are logged and
/// skipped when `isolate_errors` is set.
///
/// An `excluded` directory (the scratch area) is pruned with everything below it.
pub struct Walker {
    inner: FilterEntry<walkdir::IntoIter, EntryFilter>,
    extension: String,
    isolate_errors: bool,
}

impl Walker {
    pub fn new(
        root: &Path,
        extension: &str,
        isolate_errors: bool,
        excluded: Option<&Path>,
    ) -> Self {
        let excluded = excluded.and_then(|dir| dir.canonicalize().ok());
        let filter: EntryFilter = Box::new(move |entry: &DirEntry| match &excluded {
            Some(excluded) => !is_excluded_dir(entry, excluded),
            None => true,
        });
        Self {
            inner: WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_entry(filter),
            extension: extension.to_lowercase(),
            isolate_errors,
        }
    }
}

/// True when `entry` is the directory `excluded` (already canonical).
fn is_excluded_dir(entry: &DirEntry, excluded: &Path) -> bool {
    if !entry.file_type().is_dir() || entry.file_name() != excluded.file_name().unwrap_or_default()
    {
        return false;
    }
    let hit = entry
        .path()
        .canonicalize()
        .map(|p| p == excluded)
        .unwrap_or(false);
    if hit {
        debug!(path = %entry.path().display(), "Skipping scratch directory");
    }
    hit
}

impl Iterator for Walker {
    type Item = AppResult<SourceEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && matches_extension(entry.file_name(), &self.extension)
                    {
                        return Some(Ok(SourceEntry::file(entry.into_path())));
                    }
                }
                Err(e) if self.isolate_errors && e.depth() > 0 => {
                    warn!(
                        path = %e.path().map(|p| p.display().to_string()).unwrap_or_default(),
                        error = %e,
                        "Skipping unreadable path"
                    );
                }
                Err(e) => return Some(Err(AppError::from(e))),
            }
        }
    }
}

/// Case-insensitive suffix match on a file name. `extension` must be lowercase.
pub(crate) fn matches_extension(name: &OsStr, extension: &str) -> bool {
    name.to_string_lossy().to_lowercase().ends_with(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"PAR1").unwrap();
    }

    fn collect(root: &Path) -> Vec<std::path::PathBuf> {
        let mut paths: Vec<_> = Walker::new(root, ".parquet", false, None)
            .map(|e| e.unwrap().path)
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_walk_recursive_filters_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        touch(&base.join("a.parquet"));
        touch(&base.join("nested/b.parquet"));
        touch(&base.join("nested/deeper/c.PARQUET"));
        touch(&base.join("nested/notes.txt"));
        touch(&base.join("a.parquet-context.zip"));

        let files = collect(base);
        assert_eq!(files.len(), 3);
        assert!(files.iter().any(|p| p.ends_with("a.parquet")));
        assert!(files.iter().any(|p| p.ends_with("nested/b.parquet")));
        assert!(files.iter().any(|p| p.ends_with("nested/deeper/c.PARQUET")));
    }

    #[test]
    fn test_walk_does_not_yield_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("looks_like.parquet")).unwrap();

        assert!(collect(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_walk_single_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("only.parquet");
        touch(&file);

        let files = collect(&file);
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_walk_deep_tree() {
        let temp_dir = TempDir::new().unwrap();
        let mut dir = temp_dir.path().to_path_buf();
        for i in 0..64 {
            dir = dir.join(format!("d{i}"));
        }
        touch(&dir.join("leaf.parquet"));

        assert_eq!(collect(temp_dir.path()).len(), 1);
    }

    #[test]
    fn test_walk_missing_root_is_traversal_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let first = Walker::new(&missing, ".parquet", true, None).next().unwrap();
        assert!(matches!(first, Err(AppError::Traversal { .. })));
    }

    #[test]
    fn test_walk_skips_excluded_directory() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        touch(&base.join("a.parquet"));
        touch(&base.join("nested/b.parquet"));
        touch(&base.join(".work/stage-abc123/a.parquet"));
        touch(&base.join("other/.work/c.parquet"));

        let mut files: Vec<_> = Walker::new(base, ".parquet", false, Some(&base.join(".work")))
            .map(|e| e.unwrap().path)
            .collect();
        files.sort();

        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|p| !p.starts_with(base.join(".work"))));
        assert!(files.iter().any(|p| p.ends_with("other/.work/c.parquet")));
    }

    #[test]
    fn test_matches_extension() {
        assert!(matches_extension(OsStr::new("x.parquet"), ".parquet"));
        assert!(matches_extension(OsStr::new("X.Parquet"), ".parquet"));
        assert!(!matches_extension(OsStr::new("x.parquet.bak"), ".parquet"));
    }
}
