//! Ingestion outcome reports

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal (or queued) state of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestState {
    /// Accepted for background processing; counts are not yet known
    Queued,
    Completed,
    Failed,
}

/// Report returned by every ingestion call. Ingestion never raises; failures
/// are reported through `state` and `error_message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: Uuid,
    pub tenant_id: Uuid,
    pub state: IngestState,
    pub total_chunks: usize,
    /// Chunks that ended up with a vector, whether freshly embedded or reused
    pub embedded_chunks: usize,
    /// Chunks whose embedding was reused from the dedup cache
    pub skipped_chunks: usize,
    pub error_message: Option<String>,
    pub processing_time_ms: i64,
}

impl IngestReport {
    pub fn queued(document_id: Uuid, tenant_id: Uuid) -> Self {
        Self {
            document_id,
            tenant_id,
            state: IngestState::Queued,
            total_chunks: 0,
            embedded_chunks: 0,
            skipped_chunks: 0,
            error_message: None,
            processing_time_ms: 0,
        }
    }

    pub fn completed(
        document_id: Uuid,
        tenant_id: Uuid,
        total_chunks: usize,
        embedded_chunks: usize,
        skipped_chunks: usize,
        processing_time_ms: i64,
    ) -> Self {
        Self {
            document_id,
            tenant_id,
            state: IngestState::Completed,
            total_chunks,
            embedded_chunks,
            skipped_chunks,
            error_message: None,
            processing_time_ms,
        }
    }

    pub fn failed(
        document_id: Uuid,
        tenant_id: Uuid,
        total_chunks: usize,
        message: impl Into<String>,
        processing_time_ms: i64,
    ) -> Self {
        Self {
            document_id,
            tenant_id,
            state: IngestState::Failed,
            total_chunks,
            embedded_chunks: 0,
            skipped_chunks: 0,
            error_message: Some(message.into()),
            processing_time_ms,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == IngestState::Failed
    }
}
