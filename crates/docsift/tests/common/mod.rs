//! Shared mock providers and fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use docsift::error::{Error, Result};
use docsift::providers::{CompletionProvider, CompletionRequest, EmbeddingProvider};

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Deterministic embedder that counts calls, for asserting dedup behavior
pub struct CountingEmbedder {
    pub calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Deterministic per-text vector so reuse is observable
        let seed = text.len() as f32;
        Ok(vec![seed, text.chars().count() as f32, 1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        4
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Embedder that always fails, for error-propagation tests
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("embedding service unreachable"))
    }

    fn dimensions(&self) -> usize {
        4
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Completion provider that returns a canned response (or a canned failure)
pub struct CannedLlm {
    response: Result<String>,
}

impl CannedLlm {
    pub fn ok(response: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(response.into()),
        })
    }

    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            response: Err(Error::llm(message.into())),
        })
    }
}

#[async_trait]
impl CompletionProvider for CannedLlm {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(Error::llm(e.to_string())),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned-model"
    }
}

/// A well-formed extraction response with one confidence for every metric
pub fn extraction_json(confidence: f64) -> String {
    serde_json::json!({
        "metrics": {
            "arr": {"value": 1_200_000.0, "confidence": confidence, "source": "B2"},
            "revenue": {"value": 100_000.0, "confidence": confidence, "source": "B3"},
            "gross_margin": {"value": 0.72, "confidence": confidence, "source": "B4"},
            "cash": {"value": 3_400_000.0, "confidence": confidence, "source": "B5"},
            "burn": {"value": 120_000.0, "confidence": confidence, "source": "B6"}
        },
        "detected_period": "Q2 2026",
        "insights": ["margins are healthy"],
        "warnings": [],
        "recommendations": ["revisit pricing"]
    })
    .to_string()
}
