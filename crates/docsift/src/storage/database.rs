//! SQLite record store for documents, chunks, and analyses
//!
//! All tables carry a tenant_id column and every query filters on it, so a
//! tenant can never observe another tenant's rows through this store.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::RecordStore;
use crate::types::{
    Analysis, AnalysisResultUpdate, AnalysisStatus, ChunkRecord, DocumentRow,
    CHUNK_SCHEMA_VERSION,
};

/// Encode a float vector as little-endian bytes for BLOB storage
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// SQLite-backed [`RecordStore`]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::persistence(format!("failed to open database: {}", e)))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Create an in-memory database, used by tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::persistence(format!("failed to open in-memory database: {}", e)))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA cache_size=10000;
            PRAGMA temp_store=MEMORY;
        "#,
        )
        .map_err(|e| Error::persistence(format!("failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                name TEXT NOT NULL,
                mime_type TEXT,
                text_content TEXT,
                bucket TEXT NOT NULL,
                storage_path TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_tenant ON documents(tenant_id);

            CREATE TABLE IF NOT EXISTS document_chunks (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB,
                content_sha256 TEXT NOT NULL,
                token_count INTEGER NOT NULL,
                schema_version INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_tenant_document
                ON document_chunks(tenant_id, document_id);
            CREATE INDEX IF NOT EXISTS idx_chunks_tenant_sha
                ON document_chunks(tenant_id, content_sha256);

            CREATE TABLE IF NOT EXISTS financial_analyses (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                created_by TEXT NOT NULL,
                analysis_status TEXT NOT NULL,
                file_type TEXT NOT NULL,
                raw_analysis TEXT,
                extracted_data TEXT,
                confidence_score REAL,
                insights TEXT NOT NULL DEFAULT '[]',
                warnings TEXT NOT NULL DEFAULT '[]',
                recommendations TEXT NOT NULL DEFAULT '[]',
                error_message TEXT,
                processing_time_ms INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_analyses_tenant_document
                ON financial_analyses(tenant_id, document_id);
        "#,
        )
        .map_err(|e| Error::persistence(format!("migration failed: {}", e)))?;

        Ok(())
    }

    /// Insert a document row. Documents normally arrive through a
    /// collaborating service; this is here for tests and tooling.
    pub fn insert_document(&self, document: &DocumentRow) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO documents (id, tenant_id, name, mime_type, text_content, bucket, storage_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                document.id.to_string(),
                document.tenant_id.to_string(),
                document.name,
                document.mime_type,
                document.text_content,
                document.bucket,
                document.storage_path,
                document.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::persistence(format!("failed to insert document: {}", e)))?;
        Ok(())
    }

    /// All chunks of a document in chunk order; for tests and tooling
    pub fn list_chunks(&self, tenant_id: &Uuid, document_id: &Uuid) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, document_id, chunk_index, content, embedding,
                        content_sha256, token_count, schema_version, created_at
                 FROM document_chunks
                 WHERE tenant_id = ?1 AND document_id = ?2
                 ORDER BY chunk_index",
            )
            .map_err(|e| Error::persistence(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![tenant_id.to_string(), document_id.to_string()],
                row_to_chunk,
            )
            .map_err(|e| Error::persistence(e.to_string()))?;

        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row.map_err(|e| Error::persistence(e.to_string()))?);
        }
        Ok(chunks)
    }

    /// All analyses of a document, newest first; for tests and tooling
    pub fn analyses_for_document(
        &self,
        tenant_id: &Uuid,
        document_id: &Uuid,
    ) -> Result<Vec<Analysis>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, document_id, created_by, analysis_status, file_type,
                        raw_analysis, extracted_data, confidence_score, insights, warnings,
                        recommendations, error_message, processing_time_ms, created_at, updated_at
                 FROM financial_analyses
                 WHERE tenant_id = ?1 AND document_id = ?2
                 ORDER BY created_at DESC",
            )
            .map_err(|e| Error::persistence(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![tenant_id.to_string(), document_id.to_string()],
                row_to_analysis,
            )
            .map_err(|e| Error::persistence(e.to_string()))?;

        let mut analyses = Vec::new();
        for row in rows {
            analyses.push(row.map_err(|e| Error::persistence(e.to_string()))?);
        }
        Ok(analyses)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get_document(
        &self,
        tenant_id: &Uuid,
        document_id: &Uuid,
    ) -> Result<Option<DocumentRow>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, tenant_id, name, mime_type, text_content, bucket, storage_path, created_at
             FROM documents WHERE tenant_id = ?1 AND id = ?2",
            params![tenant_id.to_string(), document_id.to_string()],
            row_to_document,
        )
        .optional()
        .map_err(|e| Error::persistence(format!("failed to fetch document: {}", e)))
    }

    async fn update_document_text(
        &self,
        tenant_id: &Uuid,
        document_id: &Uuid,
        text: &str,
    ) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE documents SET text_content = ?3 WHERE tenant_id = ?1 AND id = ?2",
                params![tenant_id.to_string(), document_id.to_string(), text],
            )
            .map_err(|e| Error::persistence(format!("failed to update document text: {}", e)))?;
        if updated == 0 {
            return Err(Error::DocumentNotFound(document_id.to_string()));
        }
        Ok(())
    }

    async fn find_chunk_embedding(
        &self,
        tenant_id: &Uuid,
        content_sha256: &str,
    ) -> Result<Option<Vec<f32>>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT embedding FROM document_chunks
             WHERE tenant_id = ?1 AND content_sha256 = ?2 AND embedding IS NOT NULL
             LIMIT 1",
            params![tenant_id.to_string(), content_sha256],
            |row| {
                let blob: Vec<u8> = row.get(0)?;
                Ok(blob_to_vec(&blob))
            },
        )
        .optional()
        .map_err(|e| Error::persistence(format!("dedup lookup failed: {}", e)))
    }

    async fn delete_chunks(&self, tenant_id: &Uuid, document_id: &Uuid) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM document_chunks WHERE tenant_id = ?1 AND document_id = ?2",
            params![tenant_id.to_string(), document_id.to_string()],
        )
        .map_err(|e| Error::persistence(format!("failed to delete chunks: {}", e)))
    }

    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::persistence(format!("failed to begin transaction: {}", e)))?;

        let mut written = 0usize;
        for chunk in chunks {
            written += tx
                .execute(
                    "INSERT INTO document_chunks
                     (id, tenant_id, document_id, chunk_index, content, embedding,
                      content_sha256, token_count, schema_version, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        chunk.id.to_string(),
                        chunk.tenant_id.to_string(),
                        chunk.document_id.to_string(),
                        chunk.chunk_index,
                        chunk.content,
                        chunk.embedding.as_deref().map(vec_to_blob),
                        chunk.content_sha256,
                        chunk.token_count,
                        chunk.schema_version,
                        chunk.created_at.to_rfc3339(),
                    ],
                )
                .map_err(|e| Error::persistence(format!("failed to insert chunk: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| Error::persistence(format!("failed to commit chunks: {}", e)))?;
        Ok(written)
    }

    async fn chunk_counts(&self, tenant_id: &Uuid, document_id: &Uuid) -> Result<(usize, usize)> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*), COUNT(embedding) FROM document_chunks
             WHERE tenant_id = ?1 AND document_id = ?2",
            params![tenant_id.to_string(), document_id.to_string()],
            |row| {
                let total: i64 = row.get(0)?;
                let embedded: i64 = row.get(1)?;
                Ok((total as usize, embedded as usize))
            },
        )
        .map_err(|e| Error::persistence(format!("chunk count failed: {}", e)))
    }

    async fn create_analysis(&self, analysis: &Analysis) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO financial_analyses
             (id, tenant_id, document_id, created_by, analysis_status, file_type,
              raw_analysis, extracted_data, confidence_score, insights, warnings,
              recommendations, error_message, processing_time_ms, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                analysis.id.to_string(),
                analysis.tenant_id.to_string(),
                analysis.document_id.to_string(),
                analysis.created_by.to_string(),
                analysis.status.as_str(),
                analysis.file_type,
                analysis.raw_analysis.as_ref().map(|v| v.to_string()),
                analysis.extracted_data.as_ref().map(|v| v.to_string()),
                analysis.confidence_score,
                serde_json::to_string(&analysis.insights)?,
                serde_json::to_string(&analysis.warnings)?,
                serde_json::to_string(&analysis.recommendations)?,
                analysis.error_message,
                analysis.processing_time_ms,
                analysis.created_at.to_rfc3339(),
                analysis.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::persistence(format!("failed to create analysis: {}", e)))?;
        Ok(())
    }

    async fn get_analysis(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
    ) -> Result<Option<Analysis>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, tenant_id, document_id, created_by, analysis_status, file_type,
                    raw_analysis, extracted_data, confidence_score, insights, warnings,
                    recommendations, error_message, processing_time_ms, created_at, updated_at
             FROM financial_analyses WHERE tenant_id = ?1 AND id = ?2",
            params![tenant_id.to_string(), analysis_id.to_string()],
            row_to_analysis,
        )
        .optional()
        .map_err(|e| Error::persistence(format!("failed to fetch analysis: {}", e)))
    }

    async fn update_analysis_status(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
        status: AnalysisStatus,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE financial_analyses SET analysis_status = ?3, updated_at = ?4
                 WHERE tenant_id = ?1 AND id = ?2
                   AND analysis_status NOT IN ('completed', 'review', 'failed')",
                params![
                    tenant_id.to_string(),
                    analysis_id.to_string(),
                    status.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| Error::persistence(format!("failed to update status: {}", e)))?;
        Ok(updated > 0)
    }

    async fn update_analysis_result(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
        update: &AnalysisResultUpdate,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE financial_analyses SET
                     analysis_status = ?3, file_type = ?4, raw_analysis = ?5,
                     extracted_data = ?6, confidence_score = ?7, insights = ?8,
                     warnings = ?9, recommendations = ?10, processing_time_ms = ?11,
                     error_message = NULL, updated_at = ?12
                 WHERE tenant_id = ?1 AND id = ?2
                   AND analysis_status NOT IN ('completed', 'review', 'failed')",
                params![
                    tenant_id.to_string(),
                    analysis_id.to_string(),
                    update.status.as_str(),
                    update.file_type,
                    update.raw_analysis.to_string(),
                    update.extracted_data.to_string(),
                    update.confidence_score,
                    serde_json::to_string(&update.insights)?,
                    serde_json::to_string(&update.warnings)?,
                    serde_json::to_string(&update.recommendations)?,
                    update.processing_time_ms,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| Error::persistence(format!("failed to record result: {}", e)))?;
        Ok(updated > 0)
    }

    async fn update_analysis_error(
        &self,
        tenant_id: &Uuid,
        analysis_id: &Uuid,
        message: &str,
        processing_time_ms: i64,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE financial_analyses SET
                     analysis_status = 'failed', error_message = ?3,
                     processing_time_ms = ?4, updated_at = ?5
                 WHERE tenant_id = ?1 AND id = ?2
                   AND analysis_status NOT IN ('completed', 'review', 'failed')",
                params![
                    tenant_id.to_string(),
                    analysis_id.to_string(),
                    message,
                    processing_time_ms,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| Error::persistence(format!("failed to record error: {}", e)))?;
        Ok(updated > 0)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

fn parse_uuid(s: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(s: String) -> rusqlite::Result<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_string_list(s: String) -> Vec<String> {
    serde_json::from_str(&s).unwrap_or_default()
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: parse_uuid(row.get(0)?)?,
        tenant_id: parse_uuid(row.get(1)?)?,
        name: row.get(2)?,
        mime_type: row.get(3)?,
        text_content: row.get(4)?,
        bucket: row.get(5)?,
        storage_path: row.get(6)?,
        created_at: parse_timestamp(row.get(7)?)?,
    })
}

fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
    let embedding: Option<Vec<u8>> = row.get(5)?;
    Ok(ChunkRecord {
        id: parse_uuid(row.get(0)?)?,
        tenant_id: parse_uuid(row.get(1)?)?,
        document_id: parse_uuid(row.get(2)?)?,
        chunk_index: row.get(3)?,
        content: row.get(4)?,
        embedding: embedding.map(|blob| blob_to_vec(&blob)),
        content_sha256: row.get(6)?,
        token_count: row.get(7)?,
        schema_version: row.get(8)?,
        created_at: parse_timestamp(row.get(9)?)?,
    })
}

fn row_to_analysis(row: &Row<'_>) -> rusqlite::Result<Analysis> {
    let status: String = row.get(4)?;
    let raw_analysis: Option<String> = row.get(6)?;
    let extracted_data: Option<String> = row.get(7)?;
    Ok(Analysis {
        id: parse_uuid(row.get(0)?)?,
        tenant_id: parse_uuid(row.get(1)?)?,
        document_id: parse_uuid(row.get(2)?)?,
        created_by: parse_uuid(row.get(3)?)?,
        status: AnalysisStatus::from_str(&status).unwrap_or(AnalysisStatus::Failed),
        file_type: row.get(5)?,
        raw_analysis: raw_analysis.and_then(|s| serde_json::from_str(&s).ok()),
        extracted_data: extracted_data.and_then(|s| serde_json::from_str(&s).ok()),
        confidence_score: row.get(8)?,
        insights: parse_string_list(row.get(9)?),
        warnings: parse_string_list(row.get(10)?),
        recommendations: parse_string_list(row.get(11)?),
        error_message: row.get(12)?,
        processing_time_ms: row.get(13)?,
        created_at: parse_timestamp(row.get(14)?)?,
        updated_at: parse_timestamp(row.get(15)?)?,
    })
}
