//! Capability provider traits and implementations

pub mod embedding;
pub mod extract;
pub mod llm;
pub mod object_store;
pub mod ollama;
pub mod store;

pub use embedding::EmbeddingProvider;
pub use extract::{PdfTextExtractor, TextExtractor};
pub use llm::{CompletionProvider, CompletionRequest};
pub use object_store::{LocalObjectStore, ObjectStore};
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use store::RecordStore;
