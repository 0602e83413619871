//! Prompt construction for grounded question answering

use crate::providers::generator::Prompt;
use crate::retrieval::RetrievedChunk;

const SYSTEM: &str = "You are an assistant answering questions about a document corpus. \
Answer using only the provided document excerpts. \
If the excerpts do not contain the answer, say so plainly. \
Do not invent facts, sources, or citations.";

/// Builds generation prompts from assembled context chunks
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render context chunks as numbered source blocks
    pub fn build_context(chunks: &[RetrievedChunk]) -> String {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "[{}] {} ({})\n{}",
                    i + 1,
                    chunk.entry.title,
                    chunk.entry.file_type.label(),
                    chunk.entry.chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full prompt for a query over assembled chunks
    pub fn build(chunks: &[RetrievedChunk], query: &str) -> Prompt {
        Prompt {
            system: SYSTEM.to_string(),
            context: Self::build_context(chunks),
            query: query.to_string(),
        }
    }
}
