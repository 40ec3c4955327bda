//! Record store trait for documents, chunks, and analyses

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Analysis, AnalysisResultUpdate, AnalysisStatus, ChunkRecord, DocumentRow};

/// Trait for the tenant-scoped relational store.
///
/// Every method takes the tenant id; rows belonging to other tenants are
/// invisible through this interface.
///
/// Implementations:
/// - `SqliteStore`: embedded SQLite database
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a document by id within a tenant
    async fn get_document(&self, tenant_id: &Uuid, document_id: &Uuid)
        -> Result<Option<DocumentRow>>;

    /// Backfill recovered text onto a document row
    async fn update_document_text(
        &self,
        tenant_id: &Uuid,
        document_id: &Uuid,
        text: &str,
    ) -> Result<()>;

    /// Look up an existing embedding for identical content within a tenant.
    /// Chunks without a stored embedding never match.
    async fn find_chunk_embedding(
        &self,
        tenant_id: &Uuid,
        content_sha256: &str,
    ) -> Result<Option<Vec<f32>>>;

    /// Delete all chunks of a document; returns the number removed
    async fn delete_chunks(&self, tenant_id: &Uuid, document_id: &Uuid) -> Result<usize>;

    /// Insert a batch of chunks in one transaction; returns rows written
    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize>;

    /// Chunk coverage counts for a document: (total, with embedding)
    async fn chunk_counts(&self, tenant_id: &Uuid, document_id: &Uuid) -> Result<(usize, usize)>;

    /// Create a new analysis row
    async fn create_analysis(&self, analysis: &Analysis) -> Result<()>;

    /// Fetch an analysis by id within a tenant
    async fn get_analysis(&self, tenant_id: &Uuid, analysis_id: &Uuid)
        -> Result<Option<Analysis>>;

    /// Advance the lifecycle status. Terminal rows are left untouched;
    /// returns whether a row was updated.
    async fn update_analysis_status(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
        status: AnalysisStatus,
    ) -> Result<bool>;

    /// Apply the terminal success write. Terminal rows are left untouched;
    /// returns whether a row was updated.
    async fn update_analysis_result(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
        update: &AnalysisResultUpdate,
    ) -> Result<bool>;

    /// Record a terminal failure with its message. Terminal rows are left
    /// untouched; returns whether a row was updated.
    async fn update_analysis_error(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
        message: &str,
        processing_time_ms: i64,
    ) -> Result<bool>;

    /// Get store name for logging
    fn name(&self) -> &str;
}
