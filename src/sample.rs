use crate::errors::{AppError, AppResult};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Builds the sample DataFrame: four people with name, age and city.
fn sample_dataframe() -> AppResult<DataFrame> {
    DataFrame::new(vec![
        Series::new("name", &["Alice", "Bob", "Charlie", "Diana"]),
        Series::new("age", &[30i32, 25, 35, 28]),
        Series::new("city", &["New York", "San Francisco", "Seattle", "Boston"]),
    ])
    .map_err(|e| AppError::InvalidInput(format!("Failed to create DataFrame: {e}")))
}

/// Writes a small Parquet file to try the converter on.
///
/// Fails if `output` already exists so that real data is never overwritten.
pub fn write_sample(output: &Path) -> AppResult<()> {
    if output.exists() {
        return Err(AppError::Argument(format!(
            "Refusing to overwrite existing file {}",
            output.display()
        )));
    }

    let mut df = sample_dataframe()?;
    let mut file = File::create(output).map_err(|e| {
        AppError::Io(format!(
            "Failed to create Parquet file {}: {}",
            output.display(),
            e
        ))
    })?;

    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .map_err(|e| AppError::Io(format!("Failed to write Parquet file: {e}")))?;

    info!(output = %output.display(), rows = df.height(), "Sample Parquet file created");
    Ok(())
}
