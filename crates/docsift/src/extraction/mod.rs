//! LLM-based financial extraction and analysis orchestration

mod analyzer;
mod extractor;
mod result;

pub use analyzer::{AnalysisOutcome, FinancialAnalyzer};
pub use extractor::FinancialExtractor;
pub use result::{
    clean_extraction, ExtractionResult, MetricValue, CRITICAL_METRICS, EXPECTED_METRICS,
};
