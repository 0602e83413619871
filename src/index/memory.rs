//! In-process hybrid index
//!
//! Entries live in a concurrent map keyed by chunk identity. A query ranks
//! the candidate set twice, once by cosine similarity against the query
//! vector and once by a keyword score over the chunk text, then fuses the
//! two rankings by reciprocal rank. Fusion keeps a chunk competitive when
//! either signal is strong, which is what hybrid retrieval is for.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::types::document::IndexEntry;
use crate::types::query::QueryFilters;

use super::{Index, ScoredEntry};

/// Reciprocal rank fusion constant; dampens the advantage of rank 1 over
/// rank 2 so one strong list cannot drown out the other.
const RRF_K: f32 = 60.0;

/// In-memory hybrid index over chunks and embeddings
pub struct MemoryIndex {
    entries: DashMap<String, IndexEntry>,
    dimensions: usize,
}

impl MemoryIndex {
    /// Create an empty index enforcing an embedding dimension
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: DashMap::new(),
            dimensions,
        }
    }

    fn check_dimension(&self, len: usize, what: &str) -> Result<()> {
        if len != self.dimensions {
            return Err(Error::index(format!(
                "{} has dimension {}, index requires {}",
                what, len, self.dimensions
            )));
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn terms(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Keyword score: per-term frequency in the chunk, weighted by inverse
/// document frequency across the candidate set. Terms must arrive in a
/// stable order so the float summation is reproducible across processes.
fn keyword_score(query_terms: &[String], chunk_terms: &[String], idf: &HashMap<String, f32>) -> f32 {
    if chunk_terms.is_empty() {
        return 0.0;
    }
    let mut score = 0.0f32;
    for term in query_terms {
        let tf = chunk_terms.iter().filter(|t| *t == term).count() as f32;
        if tf > 0.0 {
            score += (1.0 + tf.ln()) * idf.get(term).copied().unwrap_or(0.0);
        }
    }
    score
}

/// Sort candidate indices by a score, breaking ties deterministically by
/// (chunk index, document id) so equal-score orderings are stable.
fn ranked_by<F>(candidates: &[IndexEntry], score_of: F) -> Vec<usize>
where
    F: Fn(usize) -> f32,
{
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        score_of(b)
            .partial_cmp(&score_of(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                candidates[a]
                    .chunk
                    .chunk_index
                    .cmp(&candidates[b].chunk.chunk_index)
            })
            .then_with(|| {
                candidates[a]
                    .chunk
                    .document_id
                    .cmp(&candidates[b].chunk.document_id)
            })
    });
    order
}

#[async_trait]
impl Index for MemoryIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        for entry in entries {
            self.check_dimension(entry.embedding.len(), "entry embedding")?;
            self.entries.insert(entry.id(), entry);
        }
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            if self.entries.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn query(
        &self,
        vector: &[f32],
        text: &str,
        k: usize,
        filters: &QueryFilters,
    ) -> Result<Vec<ScoredEntry>> {
        self.check_dimension(vector.len(), "query vector")?;

        let candidates: Vec<IndexEntry> = self
            .entries
            .iter()
            .filter(|e| filters.matches(&e.file_type))
            .map(|e| e.value().clone())
            .collect();

        if candidates.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let vector_scores: Vec<f32> = candidates
            .iter()
            .map(|e| cosine_similarity(vector, &e.embedding))
            .collect();

        let chunk_terms: Vec<Vec<String>> = candidates
            .iter()
            .map(|e| terms(&e.chunk.text))
            .collect();
        let mut query_terms = terms(text);
        query_terms.sort();
        query_terms.dedup();
        let idf: HashMap<String, f32> = {
            let n = candidates.len() as f32;
            let mut df: HashMap<&str, usize> = HashMap::new();
            for ct in &chunk_terms {
                let unique: HashSet<&str> = ct.iter().map(|s| s.as_str()).collect();
                for t in unique {
                    *df.entry(t).or_insert(0) += 1;
                }
            }
            df.into_iter()
                .map(|(t, d)| (t.to_string(), ((n + 1.0) / (d as f32 + 1.0)).ln()))
                .collect()
        };
        let keyword_scores: Vec<f32> = chunk_terms
            .iter()
            .map(|ct| keyword_score(&query_terms, ct, &idf))
            .collect();

        let vector_rank = ranked_by(&candidates, |i| vector_scores[i]);
        let keyword_rank = ranked_by(&candidates, |i| keyword_scores[i]);

        // Fuse: score(c) = sum over rankings of 1 / (K + rank).
        let mut fused = vec![0.0f32; candidates.len()];
        for (rank, &i) in vector_rank.iter().enumerate() {
            fused[i] += 1.0 / (RRF_K + rank as f32 + 1.0);
        }
        for (rank, &i) in keyword_rank.iter().enumerate() {
            fused[i] += 1.0 / (RRF_K + rank as f32 + 1.0);
        }

        let order = ranked_by(&candidates, |i| fused[i]);
        Ok(order
            .into_iter()
            .take(k)
            .map(|i| ScoredEntry {
                entry: candidates[i].clone(),
                score: fused[i],
            })
            .collect())
    }

    async fn ids_for_document(&self, document_id: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.chunk.document_id == document_id)
            .map(|e| e.key().clone())
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::{chunk_identity, Chunk, Document, FileType};
    use chrono::Utc;

    fn entry(doc: &str, index: u32, text: &str, embedding: Vec<f32>) -> IndexEntry {
        let document = Document::from_location(doc, FileType::from_location(doc), Utc::now());
        IndexEntry::new(
            &document,
            Chunk {
                document_id: doc.to_string(),
                chunk_index: index,
                text: text.to_string(),
                token_count: text.unicode_words().count(),
                char_start: 0,
                char_end: text.len(),
            },
            embedding,
        )
    }

    #[tokio::test]
    async fn upsert_overwrites_same_identity() {
        let index = MemoryIndex::new(3);
        index
            .upsert(vec![entry("a.txt", 0, "first", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        index
            .upsert(vec![entry("a.txt", 0, "second", vec![0.0, 1.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(index.len().await.unwrap(), 1);
        let hits = index
            .query(&[0.0, 1.0, 0.0], "second", 1, &QueryFilters::default())
            .await
            .unwrap();
        assert_eq!(hits[0].entry.chunk.text, "second");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let index = MemoryIndex::new(3);
        let err = index
            .upsert(vec![entry("a.txt", 0, "text", vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Index(_)));

        let err = index
            .query(&[1.0, 0.0], "text", 1, &QueryFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Index(_)));
    }

    #[tokio::test]
    async fn closest_vector_ranks_first() {
        let index = MemoryIndex::new(3);
        index
            .upsert(vec![
                entry("a.txt", 0, "alpha words here", vec![1.0, 0.0, 0.0]),
                entry("b.txt", 0, "beta words there", vec![0.0, 1.0, 0.0]),
                entry("c.txt", 0, "gamma words everywhere", vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = index
            .query(&[0.9, 0.1, 0.0], "alpha", 2, &QueryFilters::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.chunk.document_id, "a.txt");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn keyword_match_lifts_a_weak_vector() {
        let index = MemoryIndex::new(2);
        index
            .upsert(vec![
                entry("a.txt", 0, "general notes about scheduling", vec![1.0, 0.0]),
                entry("b.txt", 0, "vacation policy accrual rules", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        // Vector alone prefers a.txt; the keyword overlap on "vacation
        // policy" keeps b.txt in the top results.
        let hits = index
            .query(&[0.9, 0.1], "vacation policy", 2, &QueryFilters::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits
            .iter()
            .any(|h| h.entry.chunk.document_id == "b.txt"));
    }

    #[tokio::test]
    async fn file_type_filter_is_applied() {
        let index = MemoryIndex::new(2);
        index
            .upsert(vec![
                entry("a.pdf", 0, "pdf chunk", vec![1.0, 0.0]),
                entry("b.txt", 0, "txt chunk", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let filters = QueryFilters {
            file_type: Some(FileType::Txt),
        };
        let hits = index.query(&[1.0, 0.0], "chunk", 10, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.chunk.document_id, "b.txt");
    }

    #[tokio::test]
    async fn delete_reports_how_many_existed() {
        let index = MemoryIndex::new(2);
        index
            .upsert(vec![
                entry("a.txt", 0, "one", vec![1.0, 0.0]),
                entry("a.txt", 1, "two", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let ids = vec![
            chunk_identity("a.txt", 0),
            chunk_identity("a.txt", 9),
        ];
        assert_eq!(index.delete(&ids).await.unwrap(), 1);
        assert_eq!(index.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ids_for_document_covers_only_that_document() {
        let index = MemoryIndex::new(2);
        index
            .upsert(vec![
                entry("a.txt", 0, "one", vec![1.0, 0.0]),
                entry("a.txt", 1, "two", vec![0.0, 1.0]),
                entry("b.txt", 0, "three", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let mut ids = index.ids_for_document("a.txt").await.unwrap();
        ids.sort();
        assert_eq!(
            ids,
            vec![chunk_identity("a.txt", 0), chunk_identity("a.txt", 1)]
        );
    }

    #[tokio::test]
    async fn equal_scores_break_ties_by_chunk_index_then_document() {
        let index = MemoryIndex::new(2);
        // Identical embeddings and identical text: both ranking signals tie
        // across all three entries, so the final order must come from the
        // (chunk index, document id) tie-break alone.
        index
            .upsert(vec![
                entry("b.txt", 0, "same words", vec![1.0, 0.0]),
                entry("a.txt", 1, "same words", vec![1.0, 0.0]),
                entry("a.txt", 0, "same words", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index
            .query(&[1.0, 0.0], "same words", 3, &QueryFilters::default())
            .await
            .unwrap();
        let order: Vec<(String, u32)> = hits
            .iter()
            .map(|h| (h.entry.chunk.document_id.clone(), h.entry.chunk.chunk_index))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.txt".to_string(), 0),
                ("b.txt".to_string(), 0),
                ("a.txt".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn repeated_queries_rank_and_score_identically() {
        let index = MemoryIndex::new(2);
        index
            .upsert(vec![
                entry("a.txt", 0, "vacation policy accrual rules", vec![0.8, 0.2]),
                entry("b.txt", 0, "vacation request approval policy", vec![0.2, 0.8]),
                entry("c.txt", 0, "general scheduling notes", vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        let first = index
            .query(&[0.6, 0.4], "vacation policy rules", 3, &QueryFilters::default())
            .await
            .unwrap();
        let second = index
            .query(&[0.6, 0.4], "vacation policy rules", 3, &QueryFilters::default())
            .await
            .unwrap();
        let key = |hits: &[ScoredEntry]| -> Vec<(String, f32)> {
            hits.iter()
                .map(|h| (h.entry.id(), h.score))
                .collect()
        };
        assert_eq!(key(&first), key(&second));
    }

    #[tokio::test]
    async fn empty_index_returns_no_hits() {
        let index = MemoryIndex::new(2);
        let hits = index
            .query(&[1.0, 0.0], "anything", 5, &QueryFilters::default())
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
