//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, FileType, IndexEntry};
pub use query::{IngestEvent, QueryFilters, QueryRequest};
pub use response::{ChunkFailure, Citation, IngestReport, IngestState, QueryResponse};
