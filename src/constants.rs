// Naming of inputs and outputs
pub const SOURCE_EXTENSION: &str = ".parquet";
pub const ARTIFACT_SUFFIX: &str = "-context.zip";
pub const CONTENT_SUFFIX: &str = "-content.txt";

// Dump layout
pub const SCHEMA_HEADER: &str = "=== Parquet File Schema ===";
pub const CONTENTS_HEADER: &str = "=== Parquet File Contents ===";
pub const TOTAL_RECORDS_LABEL: &str = "Total records read:";

// Staging
pub const SCRATCH_DIR_NAME: &str = "pqdump-cli";
pub const STAGE_DIR_PREFIX: &str = "stage-";
// Held locked by the live attempt that owns a stage directory
pub const STAGE_LOCK_FILE: &str = ".stage.lock";
pub const PENDING_SUFFIX: &str = ".part";

// Write path
pub const MAX_COMPRESSION_LEVEL: i32 = 9;
pub const DEFAULT_WRITE_BUFFER_BYTES: usize = 16 * 1024 * 1024;
