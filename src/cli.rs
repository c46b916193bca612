use crate::config::ResolvedConfig;
use crate::dump::{self, ParquetDecoder};
use crate::errors::{AppError, AppResult};
use crate::pipeline;
use crate::sample;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::info;

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

fn build_command() -> Command<'static> {
    Command::new("pqdump-cli")
        .version(APP_VERSION)
        .author(APP_AUTHOR)
        .about(APP_ABOUT)
        .subcommand(
            Command::new("convert")
                .about("Dump every Parquet file under a path into a ZIP archive next to it")
                .after_help("Files that already have an archive are skipped.\nExample:\n  pqdump-cli convert /data/lake -w 8")
                .arg(
                    Arg::new("path")
                        .help("Parquet file or directory to convert")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help("TOML configuration file")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .help("Files converted in parallel (0 = one per CPU, 1 = sequential)")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("level")
                        .short('l')
                        .long("level")
                        .help("Deflate level for the archives, 0-9")
                        .value_parser(clap::value_parser!(i32))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("scratch_dir")
                        .long("scratch-dir")
                        .help("Directory for staging copies and working archives")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("extension")
                        .long("extension")
                        .help("File name suffix of the files to convert")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print the schema, footer statistics and rows of one Parquet file")
                .arg(
                    Arg::new("file")
                        .help("Parquet file to print")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("sample")
                .about("Write a small sample Parquet file")
                .arg(
                    Arg::new("output")
                        .help("Path of the file to create")
                        .default_value("sample.parquet")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

/// Parses command-line arguments and runs the selected subcommand.
///
/// - `convert`: batch-convert a file or directory tree
/// - `inspect`: print one file to stdout
/// - `sample`: write a sample Parquet file
///
/// Without a subcommand the help text is printed.
///
/// # Errors
///
/// Returns `Argument` for an invalid input path, `InvalidInput` for a bad
/// configuration and `Traversal` when the walk fails. Failures of individual
/// files during `convert` are logged and do not produce an error.
pub fn cli() -> AppResult<()> {
    let cmd = build_command();
    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    match matches.subcommand() {
        Some(("convert", sub)) => {
            let root = sub
                .get_one::<PathBuf>("path")
                .ok_or_else(|| AppError::Argument("Missing input path".into()))?;
            let config = resolve_config(sub)?;
            let summary = pipeline::convert(root, &config)?;
            info!(
                total = summary.total(),
                published = summary.published,
                skipped = summary.skipped,
                failed = summary.failed,
                "All operations completed"
            );
        }
        Some(("inspect", sub)) => {
            let file = sub
                .get_one::<PathBuf>("file")
                .ok_or_else(|| AppError::Argument("Missing file".into()))?;
            if !file.is_file() {
                return Err(AppError::Argument(format!(
                    "Not a file: {}",
                    file.display()
                )));
            }
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            dump::inspect(&ParquetDecoder, file, &mut out)?;
        }
        Some(("sample", sub)) => {
            let output = sub
                .get_one::<PathBuf>("output")
                .ok_or_else(|| AppError::Argument("Missing output path".into()))?;
            sample::write_sample(output)?;
        }
        _ => {
            cmd_for_help
                .print_help()
                .map_err(|e| AppError::Io(format!("Failed to print help: {e}")))?;
        }
    }

    Ok(())
}

/// Defaults, then the TOML file if given, then command-line overrides.
fn resolve_config(sub: &ArgMatches) -> AppResult<ResolvedConfig> {
    let mut config = match sub.get_one::<PathBuf>("config") {
        Some(path) => ResolvedConfig::from_toml_file(path)?,
        None => ResolvedConfig::default(),
    };
    if let Some(&workers) = sub.get_one::<usize>("workers") {
        config.workers = workers;
    }
    if let Some(&level) = sub.get_one::<i32>("level") {
        config.compression_level = level;
    }
    if let Some(dir) = sub.get_one::<PathBuf>("scratch_dir") {
        config.scratch_dir = dir.clone();
    }
    if let Some(ext) = sub.get_one::<String>("extension") {
        config.extension = ext.clone();
    }
    config.validate()?;
    Ok(config)
}
