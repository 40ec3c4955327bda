//! Financial analysis orchestrator

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result, SideEffect};
use crate::extraction::{ExtractionResult, FinancialExtractor};
use crate::providers::{ObjectStore, RecordStore};
use crate::tabular::TabularParser;
use crate::types::{Analysis, AnalysisResultUpdate, AnalysisStatus};

/// Outcome of a successful analysis run
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis_id: Uuid,
    pub status: AnalysisStatus,
    pub result: ExtractionResult,
    pub needs_review: bool,
    pub processing_time_ms: i64,
}

/// Runs the full analysis lifecycle for one document: create a pending row,
/// download and parse the file, extract metrics, and persist the terminal
/// state.
///
/// On failure the terminal `failed` row is recorded best-effort, then the
/// error is re-raised with its original [`crate::error::ErrorKind`] intact.
pub struct FinancialAnalyzer {
    store: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    parser: TabularParser,
    extractor: FinancialExtractor,
}

impl FinancialAnalyzer {
    pub fn new(
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        parser: TabularParser,
        extractor: FinancialExtractor,
    ) -> Self {
        Self {
            store,
            objects,
            parser,
            extractor,
        }
    }

    pub async fn analyze_document(
        &self,
        document_id: Uuid,
        tenant_id: Uuid,
        created_by: Uuid,
    ) -> Result<AnalysisOutcome> {
        let started = Instant::now();

        let analysis = Analysis::pending(tenant_id, document_id, created_by);
        // There is no row to record a failure on yet, but the caller still
        // sees the same wrapped error shape as every later failure.
        if let Err(e) = self.store.create_analysis(&analysis).await {
            return Err(Error::Analysis {
                kind: e.kind(),
                message: e.to_string(),
            });
        }
        let analysis_id = analysis.id;

        match self.run(analysis_id, document_id, tenant_id, &started).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let elapsed = started.elapsed().as_millis() as i64;
                let recorded = self.record_failure(analysis_id, tenant_id, &e, elapsed).await;
                if let Some(diagnostic) = &recorded.diagnostic {
                    warn!(
                        "could not record failure of analysis {}: {}",
                        analysis_id, diagnostic
                    );
                }
                Err(Error::Analysis {
                    kind: e.kind(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Fetch a previously created analysis
    pub async fn analysis_status(&self, analysis_id: Uuid, tenant_id: Uuid) -> Result<Analysis> {
        self.store
            .get_analysis(&tenant_id, &analysis_id)
            .await?
            .ok_or_else(|| Error::AnalysisNotFound(analysis_id.to_string()))
    }

    async fn run(
        &self,
        analysis_id: Uuid,
        document_id: Uuid,
        tenant_id: Uuid,
        started: &Instant,
    ) -> Result<AnalysisOutcome> {
        // Best-effort status advance; a failure here must not abort the run
        let marked = self.mark_processing(analysis_id, tenant_id).await;
        if let Some(diagnostic) = &marked.diagnostic {
            warn!(
                "could not mark analysis {} as processing: {}",
                analysis_id, diagnostic
            );
        }

        let document = self
            .store
            .get_document(&tenant_id, &document_id)
            .await?
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

        let kind = document.file_kind();
        let storage_path = document.storage_path.as_deref().ok_or_else(|| {
            Error::InvalidInput("document has no stored file to analyze".to_string())
        })?;

        let data = self.objects.download(&document.bucket, storage_path).await?;
        let sheets = self.parser.parse(&data, kind)?;
        let result = self.extractor.extract(&sheets, &document.name).await?;

        let needs_review = self.extractor.needs_review(&result);
        let status = if needs_review {
            AnalysisStatus::Review
        } else {
            AnalysisStatus::Completed
        };
        let elapsed = started.elapsed().as_millis() as i64;

        let result_json = serde_json::to_value(&result)?;
        let update = AnalysisResultUpdate {
            status,
            file_type: kind.as_str().to_string(),
            raw_analysis: result_json.clone(),
            extracted_data: result_json,
            confidence_score: result.overall_confidence,
            insights: result.insights.clone(),
            warnings: result.warnings.clone(),
            recommendations: result.recommendations.clone(),
            processing_time_ms: elapsed,
        };
        let updated = self
            .store
            .update_analysis_result(&tenant_id, &analysis_id, &update)
            .await?;
        if !updated {
            return Err(Error::persistence(format!(
                "analysis {} result write affected no rows",
                analysis_id
            )));
        }

        info!(
            "analysis {} of document {} finished as {} in {}ms",
            analysis_id,
            document_id,
            status.as_str(),
            elapsed
        );
        Ok(AnalysisOutcome {
            analysis_id,
            status,
            result,
            needs_review,
            processing_time_ms: elapsed,
        })
    }

    async fn mark_processing(&self, analysis_id: Uuid, tenant_id: Uuid) -> SideEffect {
        match self
            .store
            .update_analysis_status(&tenant_id, &analysis_id, AnalysisStatus::Processing)
            .await
        {
            Ok(true) => SideEffect::applied(),
            Ok(false) => SideEffect::skipped("status update affected no rows"),
            Err(e) => SideEffect::skipped(e.to_string()),
        }
    }

    async fn record_failure(
        &self,
        analysis_id: Uuid,
        tenant_id: Uuid,
        error: &Error,
        processing_time_ms: i64,
    ) -> SideEffect {
        match self
            .store
            .update_analysis_error(
                &tenant_id,
                &analysis_id,
                &error.to_string(),
                processing_time_ms,
            )
            .await
        {
            Ok(true) => SideEffect::applied(),
            Ok(false) => SideEffect::skipped("failure write affected no rows"),
            Err(e) => SideEffect::skipped(e.to_string()),
        }
    }
}
