//! Common test utilities for integration tests

use parquet::data_type::{ByteArray, ByteArrayType, Int32Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use pqdump_cli::config::ResolvedConfig;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Schema of the people fixtures
#[allow(dead_code)]
pub const PEOPLE_SCHEMA: &str = "message people {
  required binary name (UTF8);
  required int32 age;
}";

/// Writes a Parquet file with one row group per slice in `row_groups`.
#[allow(dead_code)]
pub fn write_people(path: &Path, row_groups: &[&[(&str, i32)]]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let schema = Arc::new(parse_message_type(PEOPLE_SCHEMA).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = fs::File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    for group in row_groups {
        let names: Vec<ByteArray> = group.iter().map(|(n, _)| ByteArray::from(*n)).collect();
        let ages: Vec<i32> = group.iter().map(|(_, a)| *a).collect();

        let mut rg = writer.next_row_group().unwrap();
        let mut col = rg.next_column().unwrap().unwrap();
        col.typed::<ByteArrayType>()
            .write_batch(&names, None, None)
            .unwrap();
        col.close().unwrap();
        let mut col = rg.next_column().unwrap().unwrap();
        col.typed::<Int32Type>().write_batch(&ages, None, None).unwrap();
        col.close().unwrap();
        rg.close().unwrap();
    }

    writer.close().unwrap();
}

/// Writes a four-person file in a single row group.
#[allow(dead_code)]
pub fn write_sample_people(path: &Path) {
    write_people(
        path,
        &[&[("Alice", 30), ("Bob", 25), ("Charlie", 35), ("Diana", 28)]],
    );
}

/// Writes bytes that no Parquet reader accepts.
#[allow(dead_code)]
pub fn write_corrupt(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"PAR1 definitely not a footer PAR1").unwrap();
}

/// Configuration with the scratch area inside `temp_dir`.
#[allow(dead_code)]
pub fn test_config(temp_dir: &TempDir, workers: usize) -> ResolvedConfig {
    ResolvedConfig {
        scratch_dir: temp_dir.path().join("scratch"),
        workers,
        ..ResolvedConfig::default()
    }
}

/// Reads the single text entry of a published artifact.
#[allow(dead_code)]
pub fn read_artifact(path: &Path, entry: &str) -> String {
    let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    assert_eq!(archive.len(), 1, "artifact must hold exactly one entry");
    let mut file = archive.by_name(entry).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}

/// Number of entries left in the scratch directory.
#[allow(dead_code)]
pub fn scratch_entries(config: &ResolvedConfig) -> usize {
    fs::read_dir(&config.scratch_dir)
        .map(|it| it.count())
        .unwrap_or(0)
}
