//! End-to-end financial analysis tests with a canned completion provider

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use docsift::config::PipelineConfig;
use docsift::error::{Error, ErrorKind, Result};
use docsift::extraction::{FinancialAnalyzer, FinancialExtractor};
use docsift::providers::{CompletionProvider, LocalObjectStore, RecordStore};
use docsift::storage::SqliteStore;
use docsift::tabular::TabularParser;
use docsift::types::{
    Analysis, AnalysisResultUpdate, AnalysisStatus, ChunkRecord, DocumentRow,
};

use common::{extraction_json, CannedLlm};

const CSV_BYTES: &[u8] =
    b"metric,value\narr,1200000\nrevenue,100000\ngross_margin,0.72\ncash,3400000\nburn,120000\n";

struct Fixture {
    store: Arc<SqliteStore>,
    analyzer: FinancialAnalyzer,
    objects: Arc<LocalObjectStore>,
    _objects_dir: tempfile::TempDir,
}

fn fixture(llm: Arc<dyn CompletionProvider>) -> Fixture {
    common::init_tracing();
    let config = PipelineConfig::default();
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let objects_dir = tempfile::tempdir().unwrap();
    let objects = Arc::new(LocalObjectStore::new(objects_dir.path()));
    let analyzer = FinancialAnalyzer::new(
        store.clone(),
        objects.clone(),
        TabularParser::new(config.limits.clone()),
        FinancialExtractor::new(llm, config.extraction.clone()),
    );
    Fixture {
        store,
        analyzer,
        objects,
        _objects_dir: objects_dir,
    }
}

async fn seed_stored_file(fx: &Fixture, tenant: Uuid, name: &str, data: &[u8]) -> DocumentRow {
    let mut doc = DocumentRow::new(tenant, name, "documents");
    let path = format!("{}/{}", tenant, name);
    fx.objects.upload("documents", &path, data).await.unwrap();
    doc.storage_path = Some(path);
    fx.store.insert_document(&doc).unwrap();
    doc
}

#[tokio::test]
async fn confident_extraction_completes() {
    let fx = fixture(CannedLlm::ok(extraction_json(0.9)));
    let tenant = Uuid::new_v4();
    let doc = seed_stored_file(&fx, tenant, "metrics.csv", CSV_BYTES).await;

    let outcome = fx
        .analyzer
        .analyze_document(doc.id, tenant, Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(outcome.status, AnalysisStatus::Completed);
    assert!(!outcome.needs_review);
    assert_eq!(outcome.result.metrics["arr"].value, Some(1_200_000.0));
    assert_eq!(outcome.result.overall_confidence, 0.9);

    let row = fx
        .analyzer
        .analysis_status(outcome.analysis_id, tenant)
        .await
        .unwrap();
    assert_eq!(row.status, AnalysisStatus::Completed);
    assert_eq!(row.file_type, "csv");
    assert_eq!(row.confidence_score, Some(0.9));
    assert!(row.extracted_data.is_some());
    assert!(row.error_message.is_none());
    assert_eq!(row.insights, vec!["margins are healthy".to_string()]);
}

#[tokio::test]
async fn low_confidence_on_a_critical_metric_routes_to_review() {
    let mut raw: serde_json::Value = serde_json::from_str(&extraction_json(0.9)).unwrap();
    raw["metrics"]["cash"]["confidence"] = serde_json::json!(0.2);
    let fx = fixture(CannedLlm::ok(raw.to_string()));

    let tenant = Uuid::new_v4();
    let doc = seed_stored_file(&fx, tenant, "metrics.csv", CSV_BYTES).await;
    let outcome = fx
        .analyzer
        .analyze_document(doc.id, tenant, Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(outcome.status, AnalysisStatus::Review);
    assert!(outcome.needs_review);

    let row = fx
        .analyzer
        .analysis_status(outcome.analysis_id, tenant)
        .await
        .unwrap();
    assert_eq!(row.status, AnalysisStatus::Review);
}

#[tokio::test]
async fn provider_failure_records_failed_row_and_reraises_with_kind() {
    let fx = fixture(CannedLlm::failing("model server is down"));
    let tenant = Uuid::new_v4();
    let doc = seed_stored_file(&fx, tenant, "metrics.csv", CSV_BYTES).await;

    let err = fx
        .analyzer
        .analyze_document(doc.id, tenant, Uuid::new_v4())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provider);
    assert!(err.to_string().contains("model server is down"));
    assert!(matches!(err, Error::Analysis { .. }));

    // the pending row was advanced to a terminal failed state with the message
    let rows = fx.store.analyses_for_document(&tenant, &doc.id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AnalysisStatus::Failed);
    assert!(rows[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("model server is down"));
    assert!(rows[0].processing_time_ms.is_some());
}

#[tokio::test]
async fn unparseable_output_fails_with_provider_kind_and_failed_row() {
    let fx = fixture(CannedLlm::ok("ARR looks great, about 1.2M"));
    let tenant = Uuid::new_v4();
    let doc = seed_stored_file(&fx, tenant, "metrics.csv", CSV_BYTES).await;

    let err = fx
        .analyzer
        .analyze_document(doc.id, tenant, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider);

    let rows = fx.store.analyses_for_document(&tenant, &doc.id).unwrap();
    assert_eq!(rows[0].status, AnalysisStatus::Failed);
    assert!(rows[0].error_message.is_some());
}

#[tokio::test]
async fn json_without_metrics_key_never_completes() {
    // syntactically valid JSON that lacks the metrics object
    let fx = fixture(CannedLlm::ok(r#"{"insights": ["looks fine"]}"#));
    let tenant = Uuid::new_v4();
    let doc = seed_stored_file(&fx, tenant, "metrics.csv", CSV_BYTES).await;

    let err = fx
        .analyzer
        .analyze_document(doc.id, tenant, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider);
    assert!(err.to_string().contains("metrics"));

    let rows = fx.store.analyses_for_document(&tenant, &doc.id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_ne!(rows[0].status, AnalysisStatus::Completed);
    assert_eq!(rows[0].status, AnalysisStatus::Failed);
}

#[tokio::test]
async fn unsupported_extension_fails_with_invalid_input_kind() {
    let fx = fixture(CannedLlm::ok(extraction_json(0.9)));
    let tenant = Uuid::new_v4();
    let doc = seed_stored_file(&fx, tenant, "notes.pdf", b"%PDF-1.4 not tabular").await;

    let err = fx
        .analyzer
        .analyze_document(doc.id, tenant, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("Unsupported file type"));
}

#[tokio::test]
async fn missing_document_fails_with_not_found_kind() {
    let fx = fixture(CannedLlm::ok(extraction_json(0.9)));
    let err = fx
        .analyzer
        .analyze_document(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn missing_stored_file_fails_with_provider_kind() {
    let fx = fixture(CannedLlm::ok(extraction_json(0.9)));
    let tenant = Uuid::new_v4();

    // document row exists but points at a path the object store lacks
    let mut doc = DocumentRow::new(tenant, "metrics.csv", "documents");
    doc.storage_path = Some("missing/metrics.csv".to_string());
    fx.store.insert_document(&doc).unwrap();

    let err = fx
        .analyzer
        .analyze_document(doc.id, tenant, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider);
}

/// Store wrapper that cannot create analysis rows, to exercise the failure
/// path before any row exists.
struct NoCreateStore {
    inner: Arc<SqliteStore>,
}

#[async_trait]
impl RecordStore for NoCreateStore {
    async fn get_document(
        &self,
        tenant_id: &Uuid,
        document_id: &Uuid,
    ) -> Result<Option<DocumentRow>> {
        self.inner.get_document(tenant_id, document_id).await
    }

    async fn update_document_text(
        &self,
        tenant_id: &Uuid,
        document_id: &Uuid,
        text: &str,
    ) -> Result<()> {
        self.inner
            .update_document_text(tenant_id, document_id, text)
            .await
    }

    async fn find_chunk_embedding(
        &self,
        tenant_id: &Uuid,
        content_sha256: &str,
    ) -> Result<Option<Vec<f32>>> {
        self.inner
            .find_chunk_embedding(tenant_id, content_sha256)
            .await
    }

    async fn delete_chunks(&self, tenant_id: &Uuid, document_id: &Uuid) -> Result<usize> {
        self.inner.delete_chunks(tenant_id, document_id).await
    }

    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        self.inner.insert_chunks(chunks).await
    }

    async fn chunk_counts(&self, tenant_id: &Uuid, document_id: &Uuid) -> Result<(usize, usize)> {
        self.inner.chunk_counts(tenant_id, document_id).await
    }

    async fn create_analysis(&self, _analysis: &Analysis) -> Result<()> {
        Err(Error::persistence("analysis table is unavailable"))
    }

    async fn get_analysis(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
    ) -> Result<Option<Analysis>> {
        self.inner.get_analysis(tenant_id, analysis_id).await
    }

    async fn update_analysis_status(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
        status: AnalysisStatus,
    ) -> Result<bool> {
        self.inner
            .update_analysis_status(tenant_id, analysis_id, status)
            .await
    }

    async fn update_analysis_result(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
        update: &AnalysisResultUpdate,
    ) -> Result<bool> {
        self.inner
            .update_analysis_result(tenant_id, analysis_id, update)
            .await
    }

    async fn update_analysis_error(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
        message: &str,
        processing_time_ms: i64,
    ) -> Result<bool> {
        self.inner
            .update_analysis_error(tenant_id, analysis_id, message, processing_time_ms)
            .await
    }

    fn name(&self) -> &str {
        "no-create"
    }
}

#[tokio::test]
async fn create_failure_reraises_with_persistence_kind() {
    common::init_tracing();
    let config = PipelineConfig::default();
    let sqlite = Arc::new(SqliteStore::in_memory().unwrap());
    let objects_dir = tempfile::tempdir().unwrap();
    let analyzer = FinancialAnalyzer::new(
        Arc::new(NoCreateStore {
            inner: sqlite.clone(),
        }),
        Arc::new(LocalObjectStore::new(objects_dir.path())),
        TabularParser::new(config.limits.clone()),
        FinancialExtractor::new(
            CannedLlm::ok(extraction_json(0.9)),
            config.extraction.clone(),
        ),
    );

    let tenant = Uuid::new_v4();
    let doc = DocumentRow::new(tenant, "metrics.csv", "documents");
    sqlite.insert_document(&doc).unwrap();

    let err = analyzer
        .analyze_document(doc.id, tenant, Uuid::new_v4())
        .await
        .unwrap_err();

    // same wrapped shape as failures that happen after the row exists
    assert!(matches!(err, Error::Analysis { .. }));
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(err.to_string().contains("analysis table is unavailable"));
    assert!(sqlite.analyses_for_document(&tenant, &doc.id).unwrap().is_empty());
}

#[tokio::test]
async fn analyses_are_tenant_scoped() {
    let fx = fixture(CannedLlm::ok(extraction_json(0.9)));
    let tenant = Uuid::new_v4();
    let doc = seed_stored_file(&fx, tenant, "metrics.csv", CSV_BYTES).await;
    let outcome = fx
        .analyzer
        .analyze_document(doc.id, tenant, Uuid::new_v4())
        .await
        .unwrap();

    let other = Uuid::new_v4();
    let err = fx
        .analyzer
        .analysis_status(outcome.analysis_id, other)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
