//! Hybrid retrieval
//!
//! Embeds the query, asks the index for an oversampled candidate list, then
//! applies the per-document diversity cap before cutting to `top_k`. The
//! oversample exists so the cap has spares to promote: without it, capping
//! a document that dominated the raw top-k would return fewer results than
//! asked for even when other documents had material.

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::providers::embedder::Embedder;
use crate::types::query::QueryRequest;

pub use crate::index::ScoredEntry;

/// A retrieved chunk with its final rank among the results
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// The scored index entry
    pub entry: crate::types::document::IndexEntry,
    /// Fused relevance score
    pub score: f32,
    /// 1-based rank after capping and truncation
    pub rank: usize,
}

/// Retrieval stage: query embedding, hybrid search, diversity cap
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn Index>,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever over an embedder and an index
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn Index>, config: RetrievalConfig) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Retrieve the chunks relevant to a query
    pub async fn retrieve(&self, request: &QueryRequest) -> Result<Vec<RetrievedChunk>> {
        let top_k = if request.top_k == 0 {
            self.config.top_k
        } else {
            request.top_k
        };

        let vector = self.embedder.embed(&request.query).await?;

        let oversampled = top_k.saturating_mul(self.config.oversample).max(top_k);
        let hits = self
            .index
            .query(&vector, &request.query, oversampled, &request.filters)
            .await
            .map_err(|e| match e {
                Error::Index(msg) => Error::retrieval(msg),
                other => other,
            })?;

        // Cap hits per document, preserving score order, then cut to top_k.
        let cap = self.config.max_per_document.max(1);
        let mut per_document: std::collections::HashMap<String, usize> =
            std::collections::HashMap::new();
        let mut results = Vec::with_capacity(top_k);
        for hit in hits {
            let count = per_document
                .entry(hit.entry.chunk.document_id.clone())
                .or_insert(0);
            if *count >= cap {
                continue;
            }
            *count += 1;
            results.push(hit);
            if results.len() == top_k {
                break;
            }
        }

        tracing::debug!(
            "Retrieved {} chunks from {} documents for query",
            results.len(),
            per_document.len()
        );

        Ok(results
            .into_iter()
            .enumerate()
            .map(|(i, hit)| RetrievedChunk {
                entry: hit.entry,
                score: hit.score,
                rank: i + 1,
            })
            .collect())
    }
}
