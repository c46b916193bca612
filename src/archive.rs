use crate::errors::{AppError, AppResult};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// ZIP container at a working path with exactly one deflated text entry open for writing.
///
/// Dropping the writer without calling [`ArchiveWriter::finish`] leaves whatever the
/// zip crate manages to flush at the working path. Such a file only ever lives inside
/// a stage directory and is deleted with it.
pub struct ArchiveWriter {
    zip: ZipWriter<BufWriter<File>>,
    path: PathBuf,
}

/// An archive whose central directory has been written and whose bytes are on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedArchive {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Name of the single entry inside the archive for a source file name.
pub fn entry_name(source_name: &str, content_suffix: &str) -> String {
    format!("{source_name}{content_suffix}")
}

impl ArchiveWriter {
    /// Creates the container and starts its only entry.
    ///
    /// ZIP64 extensions are enabled up front because the entry size is unknown
    /// until the last record has been rendered.
    pub fn create(path: &Path, entry_name: &str, compression_level: i32) -> AppResult<Self> {
        let file = File::create(path).map_err(|e| {
            AppError::Archive(format!(
                "Failed to create archive {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level))
            .large_file(true);
        zip.start_file(entry_name, options).map_err(|e| {
            AppError::Archive(format!(
                "Failed to start entry {} in {}: {}",
                entry_name,
                path.display(),
                e
            ))
        })?;

        debug!(
            archive = %path.display(),
            entry = entry_name,
            level = compression_level,
            "Opened archive entry"
        );

        Ok(Self {
            zip,
            path: path.to_path_buf(),
        })
    }

    /// Closes the entry, writes the central directory and syncs the file to disk.
    pub fn finish(mut self) -> AppResult<FinishedArchive> {
        let path = self.path.clone();
        let archive_err = |what: &str, e: &dyn std::fmt::Display| {
            AppError::Archive(format!("Failed to {what} {}: {e}", path.display()))
        };

        let buffered = self
            .zip
            .finish()
            .map_err(|e| archive_err("finalize archive", &e))?;
        let file = buffered
            .into_inner()
            .map_err(|e| archive_err("flush archive", e.error()))?;
        file.sync_all()
            .map_err(|e| archive_err("sync archive", &e))?;
        let bytes = file
            .metadata()
            .map_err(|e| archive_err("stat archive", &e))?
            .len();

        Ok(FinishedArchive {
            path: self.path.clone(),
            bytes,
        })
    }
}

impl Write for ArchiveWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.zip.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.zip.flush()
    }
}
