//! Configuration for the document pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::FileKind;

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Financial extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Per-format file size caps
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Ollama/LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Storage paths
    #[serde(default)]
    pub storage: StorageConfig,
}

impl PipelineConfig {
    /// Load from a TOML file; missing sections fall back to defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("invalid config: {}", e)))
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters (default: 900)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters carried over between adjacent chunks (default: 120)
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Chunks shorter than this after trimming are discarded (default: 100)
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_size: default_min_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    900
}

fn default_chunk_overlap() -> usize {
    120
}

fn default_min_chunk_size() -> usize {
    100
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model name (default: nomic-embed-text)
    #[serde(default = "default_embed_model")]
    pub model: String,
    /// Embedding dimensions (default: 768)
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    /// Maximum in-flight embedding requests (default: 5)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Embedding request budget per minute (default: 500)
    #[serde(default = "default_per_minute_budget")]
    pub per_minute_budget: usize,
    /// Reuse embeddings for identical content within a tenant (default: true)
    #[serde(default = "default_dedup_enabled")]
    pub dedup_enabled: bool,
}

impl EmbeddingConfig {
    /// Effective concurrency ceiling: the smaller of the concurrency knob and
    /// the per-second share of the per-minute budget, never below one.
    pub fn semaphore_permits(&self) -> usize {
        let per_second = (self.per_minute_budget / 60).max(1);
        self.max_concurrent.min(per_second).max(1)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embed_model(),
            dimensions: default_dimensions(),
            max_concurrent: default_max_concurrent(),
            per_minute_budget: default_per_minute_budget(),
            dedup_enabled: default_dedup_enabled(),
        }
    }
}

fn default_embed_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_dimensions() -> usize {
    768
}

fn default_max_concurrent() -> usize {
    5
}

fn default_per_minute_budget() -> usize {
    500
}

fn default_dedup_enabled() -> bool {
    true
}

/// Financial extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Critical metrics below this confidence trigger review (default: 0.5)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Completion temperature (default: 0.1)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token cap (default: 4000)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Rows sampled per sheet into the prompt (default: 10)
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
    /// Rows retained per sheet when projecting to JSON (default: 1000)
    #[serde(default = "default_max_rows_per_sheet")]
    pub max_rows_per_sheet: usize,
    /// Hard cap on serialized prompt size in bytes (default: 48 KiB)
    #[serde(default = "default_max_prompt_bytes")]
    pub max_prompt_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            sample_rows: default_sample_rows(),
            max_rows_per_sheet: default_max_rows_per_sheet(),
            max_prompt_bytes: default_max_prompt_bytes(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_sample_rows() -> usize {
    10
}

fn default_max_rows_per_sheet() -> usize {
    1000
}

fn default_max_prompt_bytes() -> usize {
    48 * 1024
}

/// Per-format file size caps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// CSV cap in bytes (default: 50 MiB)
    #[serde(default = "default_max_csv_bytes")]
    pub max_csv_bytes: usize,
    /// XLSX cap in bytes (default: 25 MiB)
    #[serde(default = "default_max_excel_bytes")]
    pub max_xlsx_bytes: usize,
    /// XLS cap in bytes (default: 25 MiB)
    #[serde(default = "default_max_excel_bytes")]
    pub max_xls_bytes: usize,
}

impl LimitsConfig {
    /// Cap for a supported file kind; `None` for unsupported kinds
    pub fn max_bytes(&self, kind: FileKind) -> Option<usize> {
        match kind {
            FileKind::Csv => Some(self.max_csv_bytes),
            FileKind::Xlsx => Some(self.max_xlsx_bytes),
            FileKind::Xls => Some(self.max_xls_bytes),
            FileKind::Unknown => None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_csv_bytes: default_max_csv_bytes(),
            max_xlsx_bytes: default_max_excel_bytes(),
            max_xls_bytes: default_max_excel_bytes(),
        }
    }
}

fn default_max_csv_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_max_excel_bytes() -> usize {
    25 * 1024 * 1024
}

/// Ollama/LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL (default: http://localhost:11434)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Completion model name (default: llama3.1)
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Request timeout in seconds (default: 120)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_llm_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3.1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Storage paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path (default: ~/.docsift/docsift.db)
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Root directory for locally stored objects (default: ~/.docsift/objects)
    #[serde(default = "default_objects_dir")]
    pub objects_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            objects_dir: default_objects_dir(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docsift")
}

fn default_database_path() -> PathBuf {
    data_dir().join("docsift.db")
}

fn default_objects_dir() -> PathBuf {
    data_dir().join("objects")
}
