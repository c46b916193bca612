use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Input path missing, unreadable or of the wrong kind
    #[error("Invalid argument: {0}")]
    Argument(String),
    /// A directory under the root could not be listed
    #[error("Traversal error at {}: {message}", .path.display())]
    Traversal { path: PathBuf, message: String },
    /// Staging copy could not be created or removed
    #[error("Staging error: {0}")]
    Staging(String),
    /// The decoder rejected the file contents or structure
    #[error("Decode error: {0}")]
    Decode(String),
    /// The ZIP container could not be written or finalized
    #[error("Archive error: {0}")]
    Archive(String),
    /// The finished artifact could not be moved into place
    #[error("Publish error: {0}")]
    Publish(String),
    /// Invalid configuration value or file
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(String),
}

impl AppError {
    /// Short machine-friendly name used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Argument(_) => "argument",
            AppError::Traversal { .. } => "traversal",
            AppError::Staging(_) => "staging",
            AppError::Decode(_) => "decode",
            AppError::Archive(_) => "archive",
            AppError::Publish(_) => "publish",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<parquet::errors::ParquetError> for AppError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::Archive(err.to_string())
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        AppError::Traversal {
            path,
            message: err.to_string(),
        }
    }
}

// Custom type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;
