use crate::errors::{AppError, AppResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Creates the spinner shown while a batch run walks the tree.
///
/// The total number of files is unknown up front because the walk is lazy, so
/// this counts processed files instead of drawing a bar. The spinner draws to
/// stderr and stays hidden when stderr is not a terminal.
///
/// # Example
///
/// ```no_run
/// use pqdump_cli::ui;
///
/// # fn main() -> Result<(), pqdump_cli::errors::AppError> {
/// let pb = ui::create_spinner()?;
/// pb.inc(1);
/// pb.finish_with_message("Done");
/// # Ok(())
/// # }
/// ```
pub fn create_spinner() -> AppResult<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} file(s) {msg}")
            .map_err(|e| AppError::Io(format!("Failed to create progress bar template: {e}")))?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}
