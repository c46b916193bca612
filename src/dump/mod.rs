mod decoder;
mod inspect;
mod renderer;

// Re-export public API
pub use decoder::{schema_string, DecodedFile, Decoder, ParquetDecoder, RecordStream};
pub use inspect::inspect;
pub use renderer::render_dump;
