//! Embedding gateway: bounded concurrency over an embedding provider

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::hash::{estimate_tokens, fingerprint};
use crate::providers::EmbeddingProvider;

/// An embedding together with the content fingerprint and token estimate
/// computed alongside it.
#[derive(Debug, Clone)]
pub struct EmbeddedText {
    pub embedding: Vec<f32>,
    pub content_sha256: String,
    pub token_count: usize,
}

/// Concurrency-bounded front to an [`EmbeddingProvider`].
///
/// All embedding traffic goes through a shared semaphore, so the ceiling
/// holds across concurrent document ingestions. The gateway never retries;
/// provider failures propagate untouched.
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    semaphore: Arc<Semaphore>,
    wave_size: usize,
}

impl EmbeddingGateway {
    /// Build with a semaphore sized from the config's concurrency and
    /// per-minute budget knobs.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> Self {
        let permits = config.semaphore_permits();
        Self::with_semaphore(provider, Arc::new(Semaphore::new(permits)), permits)
    }

    /// Build around an externally owned semaphore, shared with other gateways
    pub fn with_semaphore(
        provider: Arc<dyn EmbeddingProvider>,
        semaphore: Arc<Semaphore>,
        wave_size: usize,
    ) -> Self {
        Self {
            provider,
            semaphore,
            wave_size: wave_size.max(1),
        }
    }

    /// Embed one text under a semaphore permit
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::embedding("semaphore closed"))?;
        self.provider.embed(text).await
    }

    /// Embed one text and return it with its fingerprint and token estimate
    pub async fn embed_with_metadata(&self, text: &str) -> Result<EmbeddedText> {
        let embedding = self.embed(text).await?;
        Ok(EmbeddedText {
            embedding,
            content_sha256: fingerprint(text),
            token_count: estimate_tokens(text),
        })
    }

    /// Embed a batch in fixed-size waves. Order of results matches input
    /// order; the first failure aborts the batch.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for wave in texts.chunks(self.wave_size) {
            debug!("embedding wave of {} texts", wave.len());
            let futures: Vec<_> = wave.iter().map(|t| self.embed(t)).collect();
            for result in join_all(futures).await {
                out.push(result?);
            }
        }
        Ok(out)
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingEmbedder {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail: bool,
    }

    impl TrackingEmbedder {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TrackingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::embedding("provider offline"));
            }
            Ok(vec![text.len() as f32; 4])
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "tracking"
        }
    }

    #[tokio::test]
    async fn batch_preserves_order_and_bounds_concurrency() {
        let provider = Arc::new(TrackingEmbedder::new(false));
        let gateway =
            EmbeddingGateway::with_semaphore(provider.clone(), Arc::new(Semaphore::new(2)), 2);

        let texts: Vec<String> = (0..7).map(|i| "x".repeat(i + 1)).collect();
        let embeddings = gateway.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 7);
        for (i, embedding) in embeddings.iter().enumerate() {
            assert_eq!(embedding[0], (i + 1) as f32);
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 7);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn provider_errors_propagate_unchanged() {
        let provider = Arc::new(TrackingEmbedder::new(true));
        let gateway = EmbeddingGateway::new(provider, &EmbeddingConfig::default());

        let err = gateway.embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("provider offline"));
    }

    #[tokio::test]
    async fn metadata_matches_content() {
        let provider = Arc::new(TrackingEmbedder::new(false));
        let gateway = EmbeddingGateway::new(provider, &EmbeddingConfig::default());

        let embedded = gateway.embed_with_metadata("net revenue retention").await.unwrap();
        assert_eq!(embedded.content_sha256, fingerprint("net revenue retention"));
        assert!(embedded.token_count > 0);
        assert_eq!(embedded.embedding.len(), 4);
    }
}
