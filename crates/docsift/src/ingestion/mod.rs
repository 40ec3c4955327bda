//! Document ingestion: chunking, dedup, embedding, persistence

mod chunker;
mod pipeline;

pub use chunker::TextChunker;
pub use pipeline::{IngestionPipeline, EXTRACTION_FAILURE_MARKER, MIN_PLAUSIBLE_TEXT_LEN};
