//! Financial analysis records and lifecycle statuses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Analysis lifecycle. The three terminal states are never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Review,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Review => "review",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AnalysisStatus::Pending),
            "processing" => Some(AnalysisStatus::Processing),
            "completed" => Some(AnalysisStatus::Completed),
            "review" => Some(AnalysisStatus::Review),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisStatus::Completed | AnalysisStatus::Review | AnalysisStatus::Failed
        )
    }
}

/// A persisted analysis row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub document_id: Uuid,
    pub created_by: Uuid,
    pub status: AnalysisStatus,
    pub file_type: String,
    pub raw_analysis: Option<Value>,
    pub extracted_data: Option<Value>,
    pub confidence_score: Option<f64>,
    pub insights: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub error_message: Option<String>,
    pub processing_time_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Analysis {
    /// New pending row, created before any processing starts
    pub fn pending(tenant_id: Uuid, document_id: Uuid, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            document_id,
            created_by,
            status: AnalysisStatus::Pending,
            file_type: "unknown".to_string(),
            raw_analysis: None,
            extracted_data: None,
            confidence_score: None,
            insights: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
            error_message: None,
            processing_time_ms: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Terminal success write applied in a single update
#[derive(Debug, Clone)]
pub struct AnalysisResultUpdate {
    pub status: AnalysisStatus,
    pub file_type: String,
    pub raw_analysis: Value,
    pub extracted_data: Value,
    pub confidence_score: f64,
    pub insights: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub processing_time_ms: i64,
}
