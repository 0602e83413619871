//! Query and ingestion trigger request types

use serde::{Deserialize, Serialize};

use super::document::FileType;

/// Query request for the RAG system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub query: String,

    /// Number of chunks handed to the context assembler (default: 5)
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Optional structured filters
    #[serde(default)]
    pub filters: QueryFilters,
}

fn default_top_k() -> usize {
    5
}

impl QueryRequest {
    /// Create a new query with default options
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: default_top_k(),
            filters: QueryFilters::default(),
        }
    }

    /// Restrict results to a file type
    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.filters.file_type = Some(file_type);
        self
    }
}

/// Structured retrieval filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFilters {
    /// Only consider chunks from documents of this file type
    #[serde(default)]
    pub file_type: Option<FileType>,
}

impl QueryFilters {
    /// Whether an entry with the given file type passes the filter
    pub fn matches(&self, file_type: &FileType) -> bool {
        match &self.file_type {
            Some(wanted) => wanted == file_type,
            None => true,
        }
    }
}

/// Ingestion trigger: a new or updated document at `location`
///
/// Delivery is at-least-once; the pipeline's deterministic chunk identity
/// makes redelivery harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestEvent {
    /// Source location of the document (object key or path); doubles as
    /// the document id
    pub location: String,
    /// Declared file type, overrides extension-based detection when present
    #[serde(rename = "type", default)]
    pub declared_type: Option<String>,
}

impl IngestEvent {
    /// Create a trigger for a location, detecting the type from the extension
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            declared_type: None,
        }
    }

    /// Resolve the effective file type
    pub fn file_type(&self) -> FileType {
        match &self.declared_type {
            Some(t) => FileType::from_extension(t),
            None => FileType::from_location(&self.location),
        }
    }
}
