//! Context assembly under a token budget
//!
//! Chunks are admitted greedily in rank order. A chunk that does not fit
//! the remaining budget is dropped whole, never truncated; a truncated
//! chunk could cut a sentence mid-claim and make the generator cite text
//! that is not actually in the corpus.

use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievedChunk;

/// Policy deciding when retrieval results are too weak to hand to the
/// generator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ShortCircuitPolicy {
    /// Short-circuit only when retrieval returned nothing
    NoChunks,
    /// Short-circuit when the best fused score is below a threshold
    MinScore {
        /// Minimum best-chunk score required to proceed
        threshold: f32,
    },
}

impl Default for ShortCircuitPolicy {
    fn default() -> Self {
        Self::NoChunks
    }
}

impl ShortCircuitPolicy {
    /// Whether to answer "no relevant documents" instead of generating
    pub fn should_short_circuit(&self, chunks: &[RetrievedChunk]) -> bool {
        match self {
            Self::NoChunks => chunks.is_empty(),
            Self::MinScore { threshold } => chunks
                .first()
                .map(|c| c.score < *threshold)
                .unwrap_or(true),
        }
    }
}

/// Assembles retrieved chunks into the generation context
pub struct ContextAssembler {
    token_budget: usize,
    policy: ShortCircuitPolicy,
}

impl ContextAssembler {
    /// Create an assembler with a token budget and short-circuit policy
    pub fn new(token_budget: usize, policy: ShortCircuitPolicy) -> Self {
        Self {
            token_budget,
            policy,
        }
    }

    /// Whether this result set should bypass generation entirely
    pub fn should_short_circuit(&self, chunks: &[RetrievedChunk]) -> bool {
        self.policy.should_short_circuit(chunks)
    }

    /// Select the chunks that fit the budget, preserving rank order
    pub fn assemble(&self, chunks: &[RetrievedChunk]) -> Vec<RetrievedChunk> {
        let mut remaining = self.token_budget;
        let mut selected = Vec::new();

        for chunk in chunks {
            let cost = chunk.entry.chunk.token_count;
            if cost > remaining {
                tracing::debug!(
                    "Dropping chunk {} from context: {} tokens over remaining budget {}",
                    chunk.entry.id(),
                    cost,
                    remaining
                );
                continue;
            }
            remaining -= cost;
            selected.push(chunk.clone());
        }

        selected
    }
}
