//! Document ingestion: fetch, extract, chunk, embed, index, reconcile

mod chunker;
mod pipeline;

pub use chunker::{count_tokens, TextChunker};
pub use pipeline::IngestionPipeline;
