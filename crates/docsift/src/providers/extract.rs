//! Text extraction from raw document bytes

use crate::error::{Error, Result};

/// Trait for extracting plain text from raw bytes
///
/// Implementations:
/// - `PdfTextExtractor`: pdf-extract based
pub trait TextExtractor: Send + Sync {
    /// Extract text; empty output is an error
    fn extract_text(&self, data: &[u8]) -> Result<String>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

/// PDF text extractor used for recovery of failed upstream extraction
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::TextExtraction(format!("PDF extraction failed: {}", e)))?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(Error::TextExtraction(
                "PDF contains no extractable text".to_string(),
            ));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }
}
