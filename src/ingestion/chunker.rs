//! Sentence-aware text chunking
//!
//! Chunking is a pure function of (text, max_tokens, overlap_tokens): the
//! same input always yields the same chunk sequence, which together with
//! deterministic chunk identity makes re-ingestion idempotent.
//!
//! Sentences are packed whole into chunks up to the token budget. A
//! sentence that alone exceeds the budget is hard-split on word bounds.
//! Consecutive chunks overlap by whole trailing sentences totalling at
//! most `overlap_tokens`; overlap is dropped whenever carrying it would
//! stall forward progress.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::document::Chunk;

/// A contiguous run of text with its byte range and token count
#[derive(Debug, Clone, Copy)]
struct Unit {
    start: usize,
    end: usize,
    tokens: usize,
}

/// Count tokens the way the whole system does: unicode word bounds
pub fn count_tokens(text: &str) -> usize {
    text.unicode_words().count()
}

/// Sentence-aware chunker with whole-sentence overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl TextChunker {
    /// Create a chunker from config
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            max_tokens: config.max_tokens.max(1),
            overlap_tokens: config.overlap_tokens.min(config.max_tokens.saturating_sub(1)),
        }
    }

    /// Split a document's extracted text into chunks
    pub fn chunk(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        let units = self.units(text);
        if units.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current: Vec<Unit> = Vec::new();
        let mut current_tokens = 0usize;

        for unit in units {
            if current_tokens + unit.tokens > self.max_tokens && !current.is_empty() {
                chunks.push(self.emit(document_id, chunks.len() as u32, text, &current));

                let mut carry = self.overlap_suffix(&current);
                let mut carry_tokens: usize = carry.iter().map(|u| u.tokens).sum();
                // Overlap must leave room for new material in the chunk.
                if carry_tokens + unit.tokens > self.max_tokens {
                    carry.clear();
                    carry_tokens = 0;
                }
                current = carry;
                current_tokens = carry_tokens;
            }
            current_tokens += unit.tokens;
            current.push(unit);
        }

        if !current.is_empty() {
            chunks.push(self.emit(document_id, chunks.len() as u32, text, &current));
        }

        chunks
    }

    /// Sentence units, with oversized sentences hard-split on word bounds
    fn units(&self, text: &str) -> Vec<Unit> {
        let mut units = Vec::new();

        for (offset, sentence) in text.split_sentence_bound_indices() {
            let tokens = count_tokens(sentence);
            if tokens == 0 {
                continue;
            }
            if tokens <= self.max_tokens {
                units.push(Unit {
                    start: offset,
                    end: offset + sentence.len(),
                    tokens,
                });
                continue;
            }

            let mut start = offset;
            let mut end = offset;
            let mut count = 0usize;
            for (word_offset, word) in sentence.split_word_bound_indices() {
                let is_word = count_tokens(word) > 0;
                if is_word && count == self.max_tokens {
                    units.push(Unit {
                        start,
                        end,
                        tokens: count,
                    });
                    start = offset + word_offset;
                    count = 0;
                }
                if is_word {
                    count += 1;
                }
                end = offset + word_offset + word.len();
            }
            if count > 0 {
                units.push(Unit {
                    start,
                    end,
                    tokens: count,
                });
            }
        }

        units
    }

    /// Trailing units of a chunk worth at most `overlap_tokens`
    fn overlap_suffix(&self, units: &[Unit]) -> Vec<Unit> {
        let mut carry = Vec::new();
        let mut tokens = 0usize;
        for unit in units.iter().rev() {
            if tokens + unit.tokens > self.overlap_tokens {
                break;
            }
            tokens += unit.tokens;
            carry.push(*unit);
        }
        carry.reverse();
        carry
    }

    fn emit(&self, document_id: &str, chunk_index: u32, text: &str, units: &[Unit]) -> Chunk {
        let start = units[0].start;
        let end = units[units.len() - 1].end;
        let slice = &text[start..end];
        Chunk {
            document_id: document_id.to_string(),
            chunk_index,
            text: slice.to_string(),
            token_count: count_tokens(slice),
            char_start: start,
            char_end: end,
        }
    }
}
