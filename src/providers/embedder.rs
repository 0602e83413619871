//! Embedder trait: text to fixed-dimension vectors

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OllamaEmbedder`: Ollama-compatible HTTP endpoint
/// - `CachedEmbedder`: content-hash cache wrapped around any embedder
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text
    ///
    /// Callers that need many embeddings fan single calls out with bounded
    /// concurrency, which keeps failures contained per chunk.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimensions, a process-wide constant shared with the index
    fn dimensions(&self) -> usize;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
