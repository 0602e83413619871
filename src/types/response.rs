//! Response and report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{FileType, IndexEntry};

/// Document-level citation attached to an answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    /// Document title
    pub title: String,
    /// Document id
    pub document_id: String,
    /// File type
    pub file_type: FileType,
    /// Last modification time of the source document
    pub last_modified: DateTime<Utc>,
}

impl Citation {
    /// Build a citation from the metadata of an index entry
    pub fn from_entry(entry: &IndexEntry) -> Self {
        Self {
            title: entry.title.clone(),
            document_id: entry.chunk.document_id.clone(),
            file_type: entry.file_type.clone(),
            last_modified: entry.last_modified,
        }
    }
}

/// Response from a RAG query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The original query
    pub query: String,
    /// Generated answer text
    pub response: String,
    /// Citations for the documents that contributed to the assembled
    /// context, deduplicated by document and ordered by first appearance
    pub sources: Vec<Citation>,
}

impl QueryResponse {
    /// Create a new query response
    pub fn new(query: String, response: String, sources: Vec<Citation>) -> Self {
        Self {
            query,
            response,
            sources,
        }
    }

    /// Short-circuit answer when nothing relevant was retrieved; the
    /// generator is never invoked for this
    pub fn no_relevant_documents(query: String) -> Self {
        Self {
            query,
            response: "No relevant documents found.".to_string(),
            sources: Vec::new(),
        }
    }
}

/// Terminal and intermediate states of per-document ingestion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestState {
    Received,
    Extracting,
    Chunking,
    Embedding,
    Indexing,
    Done,
    /// Some chunks failed while others were indexed
    PartiallyFailed,
    Failed,
}

/// A chunk that errored out during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFailure {
    /// Index of the failed chunk within its document
    pub chunk_index: u32,
    /// Error kind (e.g. "embedding_error", "index_error")
    pub error_kind: String,
}

/// Per-document ingestion report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Document id (source location)
    pub document_id: String,
    /// Final state of the pipeline run
    pub state: IngestState,
    /// Number of chunks the document produced
    pub chunk_count: usize,
    /// Chunks that errored out, with error kind
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_chunks: Vec<ChunkFailure>,
    /// Non-fatal warnings (e.g. skipped OCR pages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Document-level error when the run failed outright
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stale entries deleted during reconciliation
    pub deleted_stale: usize,
    /// Run timing
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl IngestReport {
    /// Start a report for a document
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            state: IngestState::Received,
            chunk_count: 0,
            failed_chunks: Vec::new(),
            warnings: Vec::new(),
            error: None,
            deleted_stale: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record a document-level failure and finish the run
    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = IngestState::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    /// Finish the run, deriving the terminal state from chunk outcomes
    pub fn finish(&mut self) {
        self.state = if self.failed_chunks.is_empty() {
            IngestState::Done
        } else if self.failed_chunks.len() < self.chunk_count {
            IngestState::PartiallyFailed
        } else {
            IngestState::Failed
        };
        self.finished_at = Some(Utc::now());
    }
}
