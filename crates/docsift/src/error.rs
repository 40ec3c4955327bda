//! Error types for the document pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a pipeline failure, preserved when errors are
/// re-raised from the analysis orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced record does not exist
    NotFound,
    /// The caller supplied an unusable document or file
    InvalidInput,
    /// An external capability (embedding, LLM, object storage) failed
    Provider,
    /// A database write or read failed
    Persistence,
    /// Anything else
    Unexpected,
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Analysis not found
    #[error("Analysis not found: {0}")]
    AnalysisNotFound(String),

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// File exceeds the per-format size cap
    #[error("{file_type} file is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge {
        file_type: String,
        size: usize,
        limit: usize,
    },

    /// File parsing error
    #[error("Failed to parse {file_type} file: {message}")]
    FileParse { file_type: String, message: String },

    /// Unusable input that is not a parse failure
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// LLM output that could not be interpreted
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// Text extraction error
    #[error("Text extraction failed: {0}")]
    TextExtraction(String),

    /// Object storage error
    #[error("Object storage error: {0}")]
    ObjectStore(String),

    /// Database error
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// A failed analysis run, re-raised with the underlying kind intact
    #[error("Analysis failed: {message}")]
    Analysis { kind: ErrorKind, message: String },
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(file_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            file_type: file_type.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an invalid-response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error for callers that branch on failure class
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DocumentNotFound(_) | Error::AnalysisNotFound(_) => ErrorKind::NotFound,
            Error::UnsupportedFileType(_)
            | Error::FileTooLarge { .. }
            | Error::FileParse { .. }
            | Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Embedding(_)
            | Error::Llm(_)
            | Error::InvalidResponse(_)
            | Error::TextExtraction(_)
            | Error::ObjectStore(_)
            | Error::Http(_) => ErrorKind::Provider,
            Error::Persistence(_) => ErrorKind::Persistence,
            Error::Analysis { kind, .. } => *kind,
            Error::Config(_) | Error::Io(_) | Error::Json(_) | Error::Internal(_) => {
                ErrorKind::Unexpected
            }
        }
    }
}

/// Outcome of a best-effort side effect whose failure must not abort the
/// surrounding operation. Carries the diagnostic so callers can log or
/// assert on it.
#[derive(Debug, Clone, Default)]
pub struct SideEffect {
    pub applied: bool,
    pub diagnostic: Option<String>,
}

impl SideEffect {
    /// The side effect took hold
    pub fn applied() -> Self {
        Self {
            applied: true,
            diagnostic: None,
        }
    }

    /// The side effect was skipped or failed; the reason is kept
    pub fn skipped(diagnostic: impl Into<String>) -> Self {
        Self {
            applied: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}
