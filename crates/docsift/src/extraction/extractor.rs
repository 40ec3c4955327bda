//! Single-call financial metric extraction via a completion provider

use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::extraction::result::{clean_extraction, ExtractionResult, EXPECTED_METRICS};
use crate::providers::{CompletionProvider, CompletionRequest};
use crate::tabular::RowSet;

const SYSTEM_PROMPT: &str = "You are a financial analyst specializing in startup metrics. \
You extract key financial figures from spreadsheets and always respond with a single JSON \
object, no prose. All monetary values are plain numbers without currency symbols or \
thousands separators.";

/// Extracts startup financial metrics from parsed sheets with exactly one
/// completion call. Provider failures and unparseable output both surface
/// as errors; there are no retries.
pub struct FinancialExtractor {
    llm: Arc<dyn CompletionProvider>,
    config: ExtractionConfig,
}

impl FinancialExtractor {
    pub fn new(llm: Arc<dyn CompletionProvider>, config: ExtractionConfig) -> Self {
        Self { llm, config }
    }

    pub async fn extract(&self, sheets: &[RowSet], filename: &str) -> Result<ExtractionResult> {
        let prompt = self.build_prompt(sheets, filename);
        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            json_output: true,
        };

        let raw_text = self.llm.complete(&request).await?;
        let raw: Value = serde_json::from_str(raw_text.trim())
            .map_err(|e| Error::invalid_response(format!("model output is not JSON: {}", e)))?;
        let result = clean_extraction(&raw)?;

        info!(
            "extracted metrics from '{}' with overall confidence {:.2} (model {})",
            filename,
            result.overall_confidence,
            self.llm.model()
        );
        Ok(result)
    }

    /// Review triage using the configured confidence threshold
    pub fn needs_review(&self, result: &ExtractionResult) -> bool {
        result.needs_review(self.config.confidence_threshold)
    }

    /// Serialize sheet summaries and sampled rows into a bounded prompt
    fn build_prompt(&self, sheets: &[RowSet], filename: &str) -> String {
        let mut prompt = format!(
            "Extract financial metrics from the spreadsheet '{}'.\n\n",
            filename
        );

        for sheet in sheets {
            let summary = sheet.summarize();
            let _ = writeln!(prompt, "=== Sheet: {} ===", summary.name);
            let _ = writeln!(prompt, "Columns: {}", summary.column_names.join(", "));
            let _ = writeln!(
                prompt,
                "Rows: {} ({} non-empty), numeric columns: {}",
                summary.row_count,
                summary.non_empty_rows,
                if summary.numeric_columns.is_empty() {
                    "none".to_string()
                } else {
                    summary.numeric_columns.join(", ")
                }
            );

            let sample = sheet.to_json_rows(
                self.config.sample_rows.min(self.config.max_rows_per_sheet),
            );
            for (i, row) in sample.iter().enumerate() {
                let serialized =
                    serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string());
                let _ = writeln!(prompt, "Row {}: {}", i + 1, serialized);
            }
            prompt.push('\n');
        }

        let _ = writeln!(
            prompt,
            "METRICS TO EXTRACT: {}\n\
             - arr: annual recurring revenue\n\
             - revenue: most recent period revenue\n\
             - gross_margin: gross margin as a fraction\n\
             - cash: cash balance\n\
             - burn: monthly net burn\n\n\
             INSTRUCTIONS:\n\
             1. For each metric report a numeric value (or null if not present), \
             a confidence between 0 and 1, and the cell or row it came from.\n\
             2. Detect the reporting period if one is stated.\n\
             3. Add brief insights, warnings, and recommendations.\n\n\
             Respond with JSON of the form:\n\
             {{\"metrics\": {{\"arr\": {{\"value\": 0, \"confidence\": 0.0, \"source\": \"\"}}, ...}}, \
             \"detected_period\": null, \"insights\": [], \"warnings\": [], \"recommendations\": []}}",
            EXPECTED_METRICS.join(", ")
        );

        truncate_to_bytes(prompt, self.config.max_prompt_bytes)
    }
}

/// Truncate to at most `max_bytes`, backing up to a char boundary
fn truncate_to_bytes(mut s: String, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s;
    }
    let mut cut = max_bytes;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    s
}
