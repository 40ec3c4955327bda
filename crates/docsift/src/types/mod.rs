//! Core data types

mod analysis;
mod chunk;
mod document;
mod ingest;

pub use analysis::{Analysis, AnalysisResultUpdate, AnalysisStatus};
pub use chunk::{ChunkRecord, ChunkStatus, CHUNK_SCHEMA_VERSION};
pub use document::{DocumentRow, FileKind};
pub use ingest::{IngestReport, IngestState};
