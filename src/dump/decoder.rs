use crate::errors::{AppError, AppResult};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::reader::RowIter;
use parquet::schema::printer::print_schema;
use parquet::schema::types::Type;
use std::fs::File;
use std::path::Path;

/// Stream of rendered records in decode order.
pub type RecordStream = Box<dyn Iterator<Item = AppResult<String>>>;

/// An opened source: its schema, footer statistics and a lazy record stream.
pub struct DecodedFile {
    /// Canonical string form of the schema
    pub schema: String,
    pub row_groups: usize,
    /// Row count declared by the footer
    pub rows: i64,
    /// Records across all row groups, row-group order then within-group order
    pub records: RecordStream,
}

impl DecodedFile {
    /// Builds an in-memory decoded file from already rendered parts.
    #[cfg(test)]
    pub(crate) fn from_parts<I>(schema: impl Into<String>, records: I) -> Self
    where
        I: IntoIterator<Item = AppResult<String>>,
    {
        let records: Vec<AppResult<String>> = records.into_iter().collect();
        Self {
            schema: schema.into(),
            row_groups: 1,
            rows: records.len() as i64,
            records: Box::new(records.into_iter()),
        }
    }
}

/// Opens a columnar file for rendering.
pub trait Decoder: Send + Sync {
    fn open(&self, path: &Path) -> AppResult<DecodedFile>;
}

/// Decoder backed by the `parquet` crate's record API.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParquetDecoder;

impl Decoder for ParquetDecoder {
    fn open(&self, path: &Path) -> AppResult<DecodedFile> {
        let file = File::open(path).map_err(|e| {
            AppError::Decode(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let reader = SerializedFileReader::new(file).map_err(|e| {
            AppError::Decode(format!(
                "Failed to read Parquet footer of {}: {}",
                path.display(),
                e
            ))
        })?;

        let metadata = reader.metadata();
        let schema = schema_string(metadata.file_metadata().schema());
        let row_groups = metadata.num_row_groups();
        let rows = metadata.file_metadata().num_rows();

        let records = RowIter::from_file_into(Box::new(reader))
            .map(|row| row.map(|r| r.to_string()).map_err(AppError::from));

        Ok(DecodedFile {
            schema,
            row_groups,
            rows,
            records: Box::new(records),
        })
    }
}

/// Renders a schema tree in the `message ... { ... }` form.
pub fn schema_string(schema: &Type) -> String {
    let mut buf = Vec::new();
    print_schema(&mut buf, schema);
    String::from_utf8_lossy(&buf).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::schema::parser::parse_message_type;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn schema_string_is_canonical_message_form() {
        let schema = parse_message_type(
            "message sample { required binary name (UTF8); required int32 age; }",
        )
        .unwrap();

        let text = schema_string(&schema);
        assert!(text.starts_with("message sample {"));
        assert!(text.contains("name"));
        assert!(text.contains("INT32 age"));
        assert!(text.ends_with('}'));
    }

    #[test]
    fn open_rejects_non_parquet_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.parquet");
        fs::write(&path, b"this is not a parquet file").unwrap();

        let err = ParquetDecoder.open(&path).err().unwrap();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn open_missing_file_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ParquetDecoder
            .open(&temp_dir.path().join("missing.parquet"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("missing.parquet"));
    }

    #[test]
    fn from_parts_counts_rows() {
        let decoded = DecodedFile::from_parts("message m {}", vec![Ok("{a: 1}".to_string())]);
        assert_eq!(decoded.rows, 1);
        assert_eq!(decoded.records.count(), 1);
    }
}
