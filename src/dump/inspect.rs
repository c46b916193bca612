use super::decoder::Decoder;
use crate::errors::{AppError, AppResult};
use std::io::Write;
use std::path::Path;

const RULE: &str = "=================================================";

/// Prints footer metadata and every row of a single file to `out`.
///
/// Unlike the batch dump this is meant for a terminal: it shows the row-group
/// and row counts from the footer before streaming the rows. Returns the number
/// of rows displayed.
pub fn inspect<W: Write>(decoder: &dyn Decoder, path: &Path, out: &mut W) -> AppResult<u64> {
    let decoded = decoder.open(path)?;
    let io_err = |e: std::io::Error| AppError::Io(format!("Failed to write output: {e}"));

    writeln!(out, "{RULE}").map_err(io_err)?;
    writeln!(out, "Reading Parquet File: {}", path.display()).map_err(io_err)?;
    writeln!(out, "{RULE}").map_err(io_err)?;
    writeln!(out, "\nSchema:\n{}", decoded.schema).map_err(io_err)?;
    writeln!(out, "\nNumber of row groups: {}", decoded.row_groups).map_err(io_err)?;
    writeln!(out, "Number of rows: {}", decoded.rows).map_err(io_err)?;

    writeln!(out, "\n{RULE}\nData:\n{RULE}").map_err(io_err)?;

    let mut shown: u64 = 0;
    for record in decoded.records {
        let record = record?;
        shown += 1;
        writeln!(out, "Row {shown}:\n{record}\n").map_err(io_err)?;
    }

    writeln!(out, "{RULE}\nTotal rows displayed: {shown}\n{RULE}").map_err(io_err)?;
    out.flush().map_err(io_err)?;
    Ok(shown)
}
