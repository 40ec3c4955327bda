//! Completion provider trait for LLM-based extraction

use async_trait::async_trait;

use crate::error::Result;

/// A single structured completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt setting the extraction persona
    pub system: String,
    /// User prompt with the serialized file content
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider to constrain output to JSON
    pub json_output: bool,
}

/// Trait for LLM completions
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one completion and return the raw response text.
    ///
    /// Exactly one attempt per call; failures propagate untouched.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model identifier used for completions
    fn model(&self) -> &str;
}
