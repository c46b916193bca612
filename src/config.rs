use crate::constants::*;
use crate::errors::{AppError, AppResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved configuration with all values filled in (no Options).
///
/// Built once at startup from the defaults, an optional TOML file and CLI overrides,
/// then passed by reference to every component that needs it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolvedConfig {
    /// Suffix a file name must end with to be converted (case-insensitive)
    pub extension: String,
    /// Appended to the source file name to build the published artifact name
    pub artifact_suffix: String,
    /// Appended to the source file name to build the single entry name inside the archive
    pub content_suffix: String,
    /// Deflate level for the archive entry, 0-9
    pub compression_level: i32,
    /// Number of worker threads.
    /// When set to 0 (default), automatically uses available_parallelism().
    /// 1 processes entries strictly one after another.
    pub workers: usize,
    /// Directory holding per-attempt stage directories
    pub scratch_dir: PathBuf,
    /// Stage directories without a lock marker older than this are removed at startup
    pub stale_staging_secs: u64,
    /// Keep walking when a subdirectory cannot be listed
    pub isolate_traversal_errors: bool,
    /// Size of the buffer between the renderer and the archive entry
    pub write_buffer_bytes: usize,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            extension: SOURCE_EXTENSION.to_string(),
            artifact_suffix: ARTIFACT_SUFFIX.to_string(),
            content_suffix: CONTENT_SUFFIX.to_string(),
            compression_level: MAX_COMPRESSION_LEVEL,
            workers: 0, // 0 means auto-detect via available_parallelism()
            scratch_dir: std::env::temp_dir().join(SCRATCH_DIR_NAME),
            stale_staging_secs: 24 * 60 * 60,
            isolate_traversal_errors: false,
            write_buffer_bytes: DEFAULT_WRITE_BUFFER_BYTES,
        }
    }
}

impl ResolvedConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// Keys missing from the file keep their defaults. Unknown keys are rejected
    /// so that typos are not silently ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the TOML is malformed, contains unknown keys or
    /// fails [`ResolvedConfig::validate`]. Returns `Io` if the file cannot be read.
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AppError::Io(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: ResolvedConfig = toml::from_str(&contents)
            .map_err(|e| AppError::InvalidInput(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> AppResult<()> {
        if self.extension.trim().is_empty() {
            return Err(AppError::InvalidInput("Extension must not be empty".into()));
        }
        if self.artifact_suffix.is_empty() || self.content_suffix.is_empty() {
            return Err(AppError::InvalidInput(
                "Artifact and content suffixes must not be empty".into(),
            ));
        }
        if self
            .artifact_suffix
            .to_lowercase()
            .ends_with(&self.extension.to_lowercase())
        {
            // Artifacts would be picked up as sources on the next run.
            return Err(AppError::InvalidInput(format!(
                "Artifact suffix '{}' must not end with the source extension '{}'",
                self.artifact_suffix, self.extension
            )));
        }
        if !(0..=MAX_COMPRESSION_LEVEL).contains(&self.compression_level) {
            return Err(AppError::InvalidInput(format!(
                "Compression level must be between 0 and {MAX_COMPRESSION_LEVEL}, got {}",
                self.compression_level
            )));
        }
        if self.write_buffer_bytes == 0 {
            return Err(AppError::InvalidInput(
                "Write buffer size must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Effective number of worker threads.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
