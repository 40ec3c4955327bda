//! Chunk records produced by the ingestion pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bumped when the chunking strategy changes in a way that invalidates
/// previously stored chunks.
pub const CHUNK_SCHEMA_VERSION: i64 = 1;

/// A persisted, tenant-scoped text chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub document_id: Uuid,
    /// Zero-based position within the document; dense and gap-free
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    /// SHA-256 of `content`, lowercase hex
    pub content_sha256: String,
    pub token_count: i64,
    pub schema_version: i64,
    pub created_at: DateTime<Utc>,
}

impl ChunkRecord {
    pub fn new(
        tenant_id: Uuid,
        document_id: Uuid,
        chunk_index: i64,
        content: String,
        embedding: Option<Vec<f32>>,
        content_sha256: String,
        token_count: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            document_id,
            chunk_index,
            content,
            embedding,
            content_sha256,
            token_count,
            schema_version: CHUNK_SCHEMA_VERSION,
            created_at: Utc::now(),
        }
    }
}

/// Read-back view of a document's chunk coverage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkStatus {
    pub document_id: Uuid,
    pub total_chunks: usize,
    pub embedded_chunks: usize,
    pub fully_embedded: bool,
}
