//! pqdump-cli library
//!
//! This crate provides the core functionality for the `pqdump-cli` binary.
//! Keep the crate root minimal; implementation and tests live in their modules.
//!
//! ## Overview
//!
//! The library turns trees of Parquet files into text dumps packed in ZIP archives
//! published next to each source file:
//!
//! - [`walker`] - Lazily enumerates source files under a root
//! - [`resume`] - Skips files whose archive already exists
//! - [`staging`] - Private working copies that are removed on every exit path
//! - [`dump`] - Decodes Parquet files and renders the text dump
//! - [`archive`] - Streams the dump into a single deflated ZIP entry
//! - [`publisher`] - Moves a finished archive into place atomically
//! - [`pipeline`] - Runs the steps above per file, sequentially or on a worker pool
//! - [`cli`] - Command-line interface
//! - [`config`] - Configuration defaults and TOML loading
//! - [`errors`] - Error types used throughout the application
//!
//! ## Example Usage
//!
//! ```no_run
//! use pqdump_cli::{config::ResolvedConfig, errors::AppResult, pipeline};
//! use std::path::Path;
//!
//! # fn example() -> AppResult<()> {
//! let config = ResolvedConfig::default();
//! let summary = pipeline::convert(Path::new("/data/lake"), &config)?;
//! println!(
//!     "{} published, {} skipped, {} failed",
//!     summary.published, summary.skipped, summary.failed
//! );
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod constants;
pub mod dump;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod resume;
pub mod sample;
pub mod staging;
pub mod ui;
pub mod utils;
pub mod walker;
