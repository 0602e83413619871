//! corpus-rag: retrieval-augmented question answering over a private document corpus
//!
//! Ingests documents through an extraction → chunking → embedding → indexing
//! pipeline, then answers natural-language questions grounded in the indexed
//! corpus, citing the source documents that contributed to each answer.

pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, Document, FileType, IndexEntry},
    query::{IngestEvent, QueryFilters, QueryRequest},
    response::{Citation, ChunkFailure, IngestReport, IngestState, QueryResponse},
};
