use crate::archive::{entry_name, ArchiveWriter, FinishedArchive};
use crate::config::ResolvedConfig;
use crate::dump::{render_dump, Decoder, ParquetDecoder};
use crate::errors::{AppError, AppResult};
use crate::models::{EntryOutcome, RunSummary, SourceEntry};
use crate::publisher::{self, PublishOutcome};
use crate::resume::{self, ResumeDecision};
use crate::staging::{StagedEntry, StagingArea};
use crate::ui;
use crate::utils::{format_duration, panic_message, size_mb, throughput_mb_s};
use crate::walker::{matches_extension, Walker};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Batch converter: walks a tree and runs
/// stage → render → archive → publish → release for every source file.
pub struct Pipeline<'a> {
    config: &'a ResolvedConfig,
    decoder: &'a dyn Decoder,
    staging: StagingArea,
    // Destination directories already cleared of interrupted commits in this run
    swept_dirs: Mutex<HashSet<PathBuf>>,
}

impl<'a> Pipeline<'a> {
    /// Opens the scratch area and sweeps stage directories left by interrupted runs.
    pub fn new(config: &'a ResolvedConfig, decoder: &'a dyn Decoder) -> AppResult<Self> {
        let staging = StagingArea::open(&config.scratch_dir)?;
        staging.sweep_stale(Duration::from_secs(config.stale_staging_secs));
        Ok(Self {
            config,
            decoder,
            staging,
            swept_dirs: Mutex::new(HashSet::new()),
        })
    }

    /// Converts every matching file under `root`.
    ///
    /// With one worker entries are handled strictly in walk order; otherwise a
    /// bounded rayon pool consumes the walk. Entry failures are logged and counted
    /// in the summary.
    ///
    /// # Errors
    ///
    /// Returns `Traversal` if the walk fails (entries already in flight still
    /// finish), or `Io` if the worker pool cannot be built.
    pub fn run(&self, root: &Path) -> AppResult<RunSummary> {
        let start = Instant::now();
        let workers = self.config.worker_count();
        let walker = Walker::new(
            root,
            &self.config.extension,
            self.config.isolate_traversal_errors,
            Some(self.staging.root()),
        );
        self.swept_dirs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        let pb = ui::create_spinner()?;

        info!(
            root = %root.display(),
            workers = workers,
            scratch_dir = %self.staging.root().display(),
            "Starting conversion"
        );

        let result = if workers <= 1 {
            self.run_sequential(walker, &pb)
        } else {
            self.run_parallel(walker, workers, &pb)
        };

        let mut summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                pb.abandon_with_message("Traversal failed");
                error!(root = %root.display(), error = %e, "Conversion aborted");
                return Err(e);
            }
        };
        summary.elapsed = start.elapsed();
        pb.finish_with_message(format!(
            "{} published, {} skipped, {} failed",
            summary.published, summary.skipped, summary.failed
        ));

        log_summary(&summary);
        Ok(summary)
    }

    fn run_sequential(&self, walker: Walker, pb: &ProgressBar) -> AppResult<RunSummary> {
        let mut summary = RunSummary::default();
        for item in walker {
            let entry = item?;
            let outcome = self.process_entry(&entry);
            summary.record(&outcome);
            pb.inc(1);
        }
        Ok(summary)
    }

    fn run_parallel(
        &self,
        walker: Walker,
        workers: usize,
        pb: &ProgressBar,
    ) -> AppResult<RunSummary> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pqdump-worker-{i}"))
            .build()
            .map_err(|e| AppError::Io(format!("Failed to build worker pool: {e}")))?;

        pool.install(|| {
            walker
                .par_bridge()
                .try_fold(
                    RunSummary::default,
                    |mut summary, item: AppResult<SourceEntry>| -> AppResult<RunSummary> {
                        let entry = item?;
                        let outcome = self.process_entry(&entry);
                        summary.record(&outcome);
                        pb.inc(1);
                        Ok(summary)
                    },
                )
                .try_reduce(RunSummary::default, |a, b| Ok(a.merge(b)))
        })
    }

    /// Processes one entry and turns any entry-scoped error into `EntryOutcome::Failed`.
    ///
    /// Staging copy and working archive are gone when this returns, whatever the outcome.
    pub fn process_entry(&self, entry: &SourceEntry) -> EntryOutcome {
        match self.try_process_entry(entry) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    source = %entry.path().display(),
                    kind = e.kind(),
                    error = %e,
                    "Failed to convert file"
                );
                EntryOutcome::Failed(e)
            }
        }
    }

    fn try_process_entry(&self, entry: &SourceEntry) -> AppResult<EntryOutcome> {
        if entry.is_dir {
            return Ok(EntryOutcome::Skipped);
        }

        let destination = match resume::check(entry, &self.config.artifact_suffix) {
            ResumeDecision::Skip(destination) => {
                debug!(
                    source = %entry.path().display(),
                    artifact = %destination.display(),
                    "Skipping, artifact already exists"
                );
                return Ok(EntryOutcome::Skipped);
            }
            ResumeDecision::Proceed(destination) => destination,
        };

        debug!(source = %entry.path().display(), "Converting file");
        self.sweep_destination_once(&destination);
        let staged = self
            .staging
            .acquire(entry, &self.config.artifact_suffix)?;

        let result = self.convert_staged(entry, &staged, &destination);

        // Runs on every path; a cleanup failure never replaces the entry's own result.
        if let Err(e) = staged.release() {
            warn!(source = %entry.path().display(), error = %e, "Failed to release staging files");
        }

        result
    }

    /// Renders, archives and publishes one staged entry.
    fn convert_staged(
        &self,
        entry: &SourceEntry,
        staged: &StagedEntry,
        destination: &Path,
    ) -> AppResult<EntryOutcome> {
        let source_name = entry.file_name().unwrap_or_default();

        let (archive, records) =
            panic::catch_unwind(AssertUnwindSafe(|| self.write_archive(staged, &source_name)))
                .unwrap_or_else(|payload| {
                    Err(AppError::Decode(format!(
                        "Decoder panicked on {}: {}",
                        entry.path().display(),
                        panic_message(payload.as_ref())
                    )))
                })?;

        let outcome = match publisher::commit(&archive, destination)? {
            PublishOutcome::Committed => {
                info!(
                    source = %entry.path().display(),
                    artifact = %destination.display(),
                    records = records,
                    size_mb = size_mb(archive.bytes),
                    "✓ Published"
                );
                EntryOutcome::Published {
                    records,
                    bytes: archive.bytes,
                }
            }
            PublishOutcome::AlreadyPublished => EntryOutcome::Skipped,
        };
        Ok(outcome)
    }

    /// Clears interrupted commits from the destination directory the first time
    /// the run publishes into it. The lock is held during the sweep, so no worker
    /// of this run commits into a directory while it is being swept.
    fn sweep_destination_once(&self, destination: &Path) {
        let dir = publisher::destination_dir(destination);
        let mut swept = self
            .swept_dirs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if swept.insert(dir.to_path_buf()) {
            publisher::sweep_pending(dir, &self.config.artifact_suffix);
        }
    }

    /// Decodes the staging copy and streams its dump into the working archive.
    fn write_archive(
        &self,
        staged: &StagedEntry,
        source_name: &str,
    ) -> AppResult<(FinishedArchive, u64)> {
        let decoded = self.decoder.open(staged.copy_path())?;
        debug!(
            staging_copy = %staged.copy_path().display(),
            row_groups = decoded.row_groups,
            rows = decoded.rows,
            "Opened source"
        );

        let mut writer = ArchiveWriter::create(
            staged.working_archive(),
            &entry_name(source_name, &self.config.content_suffix),
            self.config.compression_level,
        )?;

        let records = {
            let mut out = BufWriter::with_capacity(self.config.write_buffer_bytes, &mut writer);
            let records = render_dump(decoded, &mut out)?;
            out.flush()
                .map_err(|e| AppError::Archive(format!("Failed to flush dump: {e}")))?;
            records
        };

        let archive = writer.finish()?;
        Ok((archive, records))
    }
}

fn log_summary(summary: &RunSummary) {
    info!(
        published = summary.published,
        skipped = summary.skipped,
        failed = summary.failed,
        records = summary.records,
        elapsed = format_duration(summary.elapsed),
        output_size_mb = size_mb(summary.published_bytes),
        throughput_mb_s = throughput_mb_s(summary.published_bytes, summary.elapsed),
        "Conversion completed"
    );
}

/// Rejects a root that does not exist or is neither a directory nor a matching file.
pub fn validate_root(root: &Path, config: &ResolvedConfig) -> AppResult<()> {
    if root.as_os_str().is_empty() {
        return Err(AppError::Argument("Input path must not be empty".into()));
    }
    let metadata = std::fs::metadata(root).map_err(|e| {
        AppError::Argument(format!("Cannot access {}: {}", root.display(), e))
    })?;

    if metadata.is_dir() {
        return Ok(());
    }
    if !metadata.is_file() {
        return Err(AppError::Argument(format!(
            "Not a file or directory: {}",
            root.display()
        )));
    }
    let name = root.file_name().unwrap_or_default();
    if !matches_extension(name, &config.extension.to_lowercase()) {
        return Err(AppError::Argument(format!(
            "{} does not end with {}",
            root.display(),
            config.extension
        )));
    }
    Ok(())
}

/// Validates the inputs and converts `root` with the Parquet decoder.
///
/// # Example
///
/// ```no_run
/// use pqdump_cli::{config::ResolvedConfig, pipeline};
/// use std::path::Path;
///
/// # fn main() -> Result<(), pqdump_cli::errors::AppError> {
/// let config = ResolvedConfig::default();
/// let summary = pipeline::convert(Path::new("/data/lake"), &config)?;
/// println!("{} published", summary.published);
/// # Ok(())
/// # }
/// ```
pub fn convert(root: &Path, config: &ResolvedConfig) -> AppResult<RunSummary> {
    config.validate()?;
    validate_root(root, config)?;
    let decoder = ParquetDecoder;
    Pipeline::new(config, &decoder)?.run(root)
}
