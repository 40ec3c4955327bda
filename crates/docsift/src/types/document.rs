//! Document records and file-type classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant-owned document row. Documents are created by a collaborating
/// service; this pipeline reads them, backfills extracted text, and derives
/// chunks and analyses from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Original filename, used for file-type detection
    pub name: String,
    pub mime_type: Option<String>,
    /// Extracted text, if any. May hold a placeholder marker when upstream
    /// extraction failed at upload time.
    pub text_content: Option<String>,
    /// Object-store bucket holding the raw bytes
    pub bucket: String,
    /// Path within the bucket, if the raw bytes were retained
    pub storage_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DocumentRow {
    pub fn new(tenant_id: Uuid, name: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            mime_type: None,
            text_content: None,
            bucket: bucket.into(),
            storage_path: None,
            created_at: Utc::now(),
        }
    }

    /// File kind derived from the filename extension
    pub fn file_kind(&self) -> FileKind {
        FileKind::from_filename(&self.name)
    }
}

/// Tabular file formats accepted by the financial analysis path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Csv,
    Xls,
    Xlsx,
    Unknown,
}

impl FileKind {
    /// Classify by filename extension, case-insensitive
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "csv" => FileKind::Csv,
            "xls" => FileKind::Xls,
            "xlsx" => FileKind::Xlsx,
            _ => FileKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Csv => "csv",
            FileKind::Xls => "xls",
            FileKind::Xlsx => "xlsx",
            FileKind::Unknown => "unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FileKind::Unknown)
    }
}
