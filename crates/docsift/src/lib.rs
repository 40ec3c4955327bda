//! # docsift
//!
//! Multi-tenant document intelligence pipeline with two paths:
//!
//! - **Ingestion**: recover missing text, chunk it with overlap, embed each
//!   chunk behind a shared concurrency gateway (reusing embeddings for
//!   identical content within a tenant), and persist the chunks.
//! - **Financial analysis**: parse CSV/Excel files into row sets, run one
//!   LLM extraction call for the key startup metrics, and triage the result
//!   to completed or human review based on per-metric confidence.
//!
//! All stored rows are tenant-scoped; external capabilities (embeddings,
//! completions, object storage, record storage, text extraction) sit behind
//! provider traits.

pub mod config;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod hash;
pub mod ingestion;
pub mod providers;
pub mod storage;
pub mod tabular;
pub mod types;

pub use config::PipelineConfig;
pub use embedding::{EmbeddedText, EmbeddingGateway};
pub use error::{Error, ErrorKind, Result, SideEffect};
pub use extraction::{AnalysisOutcome, ExtractionResult, FinancialAnalyzer, FinancialExtractor};
pub use ingestion::{IngestionPipeline, TextChunker};
pub use storage::SqliteStore;
pub use tabular::{RowSet, TabularParser};
pub use types::{Analysis, AnalysisStatus, ChunkRecord, DocumentRow, IngestReport, IngestState};
