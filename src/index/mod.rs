//! Hybrid (vector + keyword) index keyed by chunk identity

mod memory;

pub use memory::MemoryIndex;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::document::IndexEntry;
use crate::types::query::QueryFilters;

/// An index entry with its relevance score for a query
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    /// The matched entry
    pub entry: IndexEntry,
    /// Fused relevance score, higher is better
    pub score: f32,
}

/// Trait for the hybrid store of chunks and embeddings
///
/// Implementations:
/// - `MemoryIndex`: in-process store with cosine + keyword rankings fused
///   by reciprocal rank
#[async_trait]
pub trait Index: Send + Sync {
    /// Upsert entries; per-entry atomic, id collision overwrites.
    /// Batch upserts are not atomic as a whole.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Delete entries by id, returning how many existed
    async fn delete(&self, ids: &[String]) -> Result<usize>;

    /// Top-`k` entries by hybrid relevance, after filters. The vector
    /// drives the semantic ranking and the raw query text the keyword one.
    async fn query(
        &self,
        vector: &[f32],
        text: &str,
        k: usize,
        filters: &QueryFilters,
    ) -> Result<Vec<ScoredEntry>>;

    /// All entry ids currently indexed for a document, used by
    /// re-ingestion reconciliation
    async fn ids_for_document(&self, document_id: &str) -> Result<Vec<String>>;

    /// Total number of entries
    async fn len(&self) -> Result<usize>;

    /// Whether the index holds no entries
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Embedding dimension this index enforces
    fn dimensions(&self) -> usize;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
