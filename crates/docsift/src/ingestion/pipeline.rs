//! Ingestion pipeline orchestrator

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::embedding::EmbeddingGateway;
use crate::error::{Error, Result, SideEffect};
use crate::hash::{estimate_tokens, fingerprint};
use crate::ingestion::TextChunker;
use crate::providers::{ObjectStore, RecordStore, TextExtractor};
use crate::types::{ChunkRecord, ChunkStatus, DocumentRow, IngestReport};

/// Marker written by the upstream uploader when its own text extraction
/// failed at upload time.
pub const EXTRACTION_FAILURE_MARKER: &str = "Text extraction temporarily unavailable";

/// Stored text shorter than this is treated as an extraction failure
pub const MIN_PLAUSIBLE_TEXT_LEN: usize = 50;

/// Orchestrates document ingestion: text recovery, chunking, dedup,
/// embedding, and chunk persistence.
///
/// `process_document` is a catch-all boundary: it always returns an
/// [`IngestReport`] and never an error.
pub struct IngestionPipeline {
    store: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    extractor: Arc<dyn TextExtractor>,
    gateway: Arc<EmbeddingGateway>,
    chunker: TextChunker,
    dedup_enabled: bool,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        extractor: Arc<dyn TextExtractor>,
        gateway: Arc<EmbeddingGateway>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            objects,
            extractor,
            gateway,
            chunker: TextChunker::from_config(&config.chunking),
            dedup_enabled: config.embeddings.dedup_enabled,
        }
    }

    /// Ingest one document. Never fails: any error is folded into a failed
    /// report with its message.
    pub async fn process_document(
        &self,
        document_id: Uuid,
        tenant_id: Uuid,
        force_reembed: bool,
    ) -> IngestReport {
        let started = Instant::now();
        match self.run(document_id, tenant_id, force_reembed, &started).await {
            Ok(report) => report,
            Err(e) => {
                warn!("ingestion of document {} failed: {}", document_id, e);
                IngestReport::failed(
                    document_id,
                    tenant_id,
                    0,
                    e.to_string(),
                    started.elapsed().as_millis() as i64,
                )
            }
        }
    }

    /// Accept a document for background ingestion and return immediately
    /// with a queued report.
    pub fn enqueue(
        self: &Arc<Self>,
        document_id: Uuid,
        tenant_id: Uuid,
        force_reembed: bool,
    ) -> IngestReport {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let report = pipeline
                .process_document(document_id, tenant_id, force_reembed)
                .await;
            if report.is_failed() {
                warn!(
                    "background ingestion of document {} failed: {}",
                    document_id,
                    report.error_message.as_deref().unwrap_or("unknown")
                );
            }
        });
        IngestReport::queued(document_id, tenant_id)
    }

    /// Chunk coverage for a document
    pub async fn chunk_status(&self, document_id: Uuid, tenant_id: Uuid) -> Result<ChunkStatus> {
        let (total, embedded) = self.store.chunk_counts(&tenant_id, &document_id).await?;
        Ok(ChunkStatus {
            document_id,
            total_chunks: total,
            embedded_chunks: embedded,
            fully_embedded: total > 0 && embedded == total,
        })
    }

    async fn run(
        &self,
        document_id: Uuid,
        tenant_id: Uuid,
        force_reembed: bool,
        started: &Instant,
    ) -> Result<IngestReport> {
        let document = self
            .store
            .get_document(&tenant_id, &document_id)
            .await?
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

        let mut text = document.text_content.clone().unwrap_or_default();

        if is_extraction_failure(&text) && document.mime_type.as_deref() == Some("application/pdf")
        {
            let (recovered, write_back) = self.recover_pdf_text(&document).await;
            if let Some(diagnostic) = &write_back.diagnostic {
                warn!(
                    "text recovery for document {}: {}",
                    document_id, diagnostic
                );
            }
            if let Some(recovered) = recovered {
                text = recovered;
            }
        }

        if text.trim().is_empty() || is_extraction_failure(&text) {
            return Err(Error::InvalidInput(
                "document has no text content and text recovery failed".to_string(),
            ));
        }

        if force_reembed {
            let removed = self.store.delete_chunks(&tenant_id, &document_id).await?;
            info!(
                "force re-embed: removed {} existing chunks for document {}",
                removed, document_id
            );
        }

        let segments = self.chunker.split(&text);
        let total_chunks = segments.len();
        let mut records = Vec::with_capacity(total_chunks);
        let mut fresh_embeds = 0usize;
        let mut skipped_chunks = 0usize;

        for (index, segment) in segments.iter().enumerate() {
            let content_sha256 = fingerprint(segment);
            let token_count = estimate_tokens(segment) as i64;

            // Dedup probe before spending an embedding call
            let mut embedding = None;
            if self.dedup_enabled && !force_reembed {
                embedding = self
                    .store
                    .find_chunk_embedding(&tenant_id, &content_sha256)
                    .await?;
            }

            let embedding = match embedding {
                Some(existing) => {
                    skipped_chunks += 1;
                    existing
                }
                None => {
                    let fresh = self.gateway.embed(segment).await?;
                    fresh_embeds += 1;
                    fresh
                }
            };

            records.push(ChunkRecord::new(
                tenant_id,
                document_id,
                index as i64,
                segment.clone(),
                Some(embedding),
                content_sha256,
                token_count,
            ));
        }

        if !records.is_empty() {
            let written = self.store.insert_chunks(&records).await?;
            if written == 0 {
                return Ok(IngestReport::failed(
                    document_id,
                    tenant_id,
                    total_chunks,
                    "failed to persist chunks: no rows written",
                    started.elapsed().as_millis() as i64,
                ));
            }
        }

        let elapsed = started.elapsed().as_millis() as i64;
        info!(
            "ingested document {}: {} chunks ({} freshly embedded, {} deduped) in {}ms",
            document_id, total_chunks, fresh_embeds, skipped_chunks, elapsed
        );
        // Every persisted chunk carries a vector, fresh or reused, so the
        // embedded count equals the total; skipped_chunks is the dedup stat.
        Ok(IngestReport::completed(
            document_id,
            tenant_id,
            total_chunks,
            total_chunks,
            skipped_chunks,
            elapsed,
        ))
    }

    /// Best-effort PDF text recovery. Extraction failure is swallowed;
    /// recovered text is used even when the write-back fails.
    async fn recover_pdf_text(&self, document: &DocumentRow) -> (Option<String>, SideEffect) {
        let Some(storage_path) = document.storage_path.as_deref() else {
            return (
                None,
                SideEffect::skipped("document has no storage path to recover from"),
            );
        };

        let text = match self.objects.download(&document.bucket, storage_path).await {
            Ok(data) => match self.extractor.extract_text(&data) {
                Ok(text) => text,
                Err(e) => return (None, SideEffect::skipped(e.to_string())),
            },
            Err(e) => return (None, SideEffect::skipped(e.to_string())),
        };

        info!(
            "recovered {} chars of text for document {}",
            text.len(),
            document.id
        );
        let write_back = match self
            .store
            .update_document_text(&document.tenant_id, &document.id, &text)
            .await
        {
            Ok(()) => SideEffect::applied(),
            Err(e) => SideEffect::skipped(format!("recovered text write-back failed: {}", e)),
        };
        (Some(text), write_back)
    }
}

/// True when stored text is missing, the upstream failure marker, or too
/// short to be a plausible extraction.
fn is_extraction_failure(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty()
        || trimmed.contains(EXTRACTION_FAILURE_MARKER)
        || trimmed.chars().count() < MIN_PLAUSIBLE_TEXT_LEN
}
