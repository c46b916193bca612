use super::decoder::DecodedFile;
use crate::constants::{CONTENTS_HEADER, SCHEMA_HEADER, TOTAL_RECORDS_LABEL};
use crate::errors::{AppError, AppResult};
use std::fmt;
use std::io::Write;

/// Line writer that reports sink failures as archive errors.
struct DumpWriter<'a, W: Write> {
    out: &'a mut W,
}

impl<W: Write> DumpWriter<'_, W> {
    fn line(&mut self, args: fmt::Arguments<'_>) -> AppResult<()> {
        self.out
            .write_fmt(args)
            .and_then(|_| self.out.write_all(b"\n"))
            .map_err(|e| AppError::Archive(format!("Failed to write dump: {e}")))
    }

    fn blank(&mut self) -> AppResult<()> {
        self.line(format_args!(""))
    }
}

/// Writes the text dump of `decoded` to `out` and returns the number of records.
///
/// Layout:
///
/// ```text
/// === Parquet File Schema ===
///
/// message schema { ... }
///
/// === Parquet File Contents ===
///
/// *** Record 1 ***
/// {name: "Alice", age: 30}
/// ...
///
/// Total records read: N
/// ```
///
/// Records are written as they are decoded; nothing is buffered beyond what
/// `out` buffers itself. Ordinals start at 1 and run across row groups without gaps.
///
/// # Errors
///
/// The first record the decoder fails on aborts rendering with that `Decode` error.
/// Failures of `out` are returned as `Archive` errors.
pub fn render_dump<W: Write>(decoded: DecodedFile, out: &mut W) -> AppResult<u64> {
    let DecodedFile {
        schema, records, ..
    } = decoded;
    let mut w = DumpWriter { out };

    w.line(format_args!("{SCHEMA_HEADER}"))?;
    w.blank()?;
    w.line(format_args!("{schema}"))?;
    w.blank()?;

    w.line(format_args!("{CONTENTS_HEADER}"))?;
    w.blank()?;

    let mut count: u64 = 0;
    for record in records {
        let record = record?;
        count += 1;
        w.line(format_args!("*** Record {count} ***"))?;
        w.line(format_args!("{record}"))?;
    }

    w.blank()?;
    w.line(format_args!("{TOTAL_RECORDS_LABEL} {count}"))?;

    Ok(count)
}
