//! Citation extraction from assembled context
//!
//! Citations are document-level: several chunks of the same document
//! collapse into one citation, ordered by where the document first
//! appears in the context.

use std::collections::HashSet;

use crate::retrieval::RetrievedChunk;
use crate::types::response::Citation;

/// Build deduplicated, first-appearance-ordered citations for the chunks
/// that made it into the context
pub fn build_citations(chunks: &[RetrievedChunk]) -> Vec<Citation> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut citations = Vec::new();

    for chunk in chunks {
        if seen.insert(&chunk.entry.chunk.document_id) {
            citations.push(Citation::from_entry(&chunk.entry));
        }
    }

    citations
}
