//! Content-hash embedding cache
//!
//! Re-ingesting a document whose chunks are unchanged should not pay the
//! embedding provider again; vectors are cached keyed by sha256 of the text.

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::error::Result;

use super::embedder::Embedder;

/// Embedder wrapper that caches vectors by content hash
pub struct CachedEmbedder<E> {
    inner: E,
    cache: DashMap<String, Vec<f32>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    /// Wrap an embedder with a cache
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Number of cached vectors
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn content_hash(text: &str) -> String {
        hex::encode(Sha256::digest(text.as_bytes()))
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = Self::content_hash(text);

        if let Some(cached) = self.cache.get(&key) {
            // A hit is only trusted if it still matches the index dimension.
            if cached.len() == self.inner.dimensions() {
                return Ok(cached.clone());
            }
            tracing::warn!(
                "Discarding cached embedding with stale dimension {} (expected {})",
                cached.len(),
                self.inner.dimensions()
            );
            drop(cached);
            self.cache.remove(&key);
        }

        let embedding = self.inner.embed(text).await?;
        self.cache.insert(key, embedding.clone());
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
