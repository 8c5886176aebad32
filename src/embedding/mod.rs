//! Text-to-vector embedding pipeline.
//!
//! Provides the async [`EmbeddingProvider`] trait and an Ollama implementation
//! (`POST /api/embeddings`). The provider is created via [`create_provider`]
//! from configuration.

pub mod ollama;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MemoryError;

/// Trait for embedding text into vectors.
///
/// Implementations return vectors of exactly [`dimensions`](Self::dimensions)
/// components or fail with [`MemoryError::SchemaMismatch`]. Service failures
/// surface as [`MemoryError::EmbeddingUnavailable`] so callers can retry.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;

    /// Number of components every returned vector has.
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Create the embedding provider described by the config.
pub fn create_provider(
    config: &crate::config::RecollectConfig,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let provider = ollama::OllamaEmbeddingProvider::new(
        &config.ollama.base_url,
        &config.embedding.model,
        config.embedding.dimensions,
        std::time::Duration::from_secs(config.ollama.request_timeout_secs),
    )?;
    tracing::info!(
        model = %config.embedding.model,
        dimensions = config.embedding.dimensions,
        "embedding provider ready"
    );
    Ok(Arc::new(provider))
}
