//! Document, chunk, and index entry types
//!
//! Chunk identity is a deterministic function of (document id, chunk index);
//! re-ingesting the same document always produces the same ids, which is what
//! makes re-ingestion idempotent under at-least-once trigger delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported file types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document (scanned pages go through OCR)
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// JSON file (indexed as text)
    Json,
    /// Image (OCR)
    Image,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" | "doc" => Self::Docx,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            "json" => Self::Json,
            "png" | "jpg" | "jpeg" => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a source location (object key or path)
    pub fn from_location(location: &str) -> Self {
        location
            .rsplit('.')
            .next()
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Formats that can be decoded in-process, without the OCR service
    pub fn is_plain_text(&self) -> bool {
        matches!(self, Self::Txt | Self::Markdown | Self::Json)
    }

    /// Extension-style label used in citations and filters
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Image => "image",
            Self::Unknown => "unknown",
        }
    }
}

/// A document known to the system
///
/// The id is the source location and is stable across re-ingestion; a
/// re-ingestion never mutates a document in place, it computes a full
/// replacement chunk set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable document id, derived from the source location
    pub id: String,
    /// Display title (final path segment of the location)
    pub title: String,
    /// File type
    pub file_type: FileType,
    /// Last modification time of the source object
    pub last_modified: DateTime<Utc>,
}

impl Document {
    /// Create a document from its source location
    pub fn from_location(
        location: &str,
        file_type: FileType,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let title = location
            .rsplit('/')
            .next()
            .unwrap_or(location)
            .to_string();
        Self {
            id: location.to_string(),
            title,
            file_type,
            last_modified,
        }
    }
}

/// A chunk of a document's text, the unit of embedding and indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Parent document id
    pub document_id: String,
    /// 0-based index, contiguous within the document
    pub chunk_index: u32,
    /// Text content
    pub text: String,
    /// Token count of the text
    pub token_count: usize,
    /// Byte offsets into the extracted document text
    pub char_start: usize,
    pub char_end: usize,
}

impl Chunk {
    /// Deterministic chunk identity
    pub fn identity(&self) -> String {
        chunk_identity(&self.document_id, self.chunk_index)
    }
}

/// Deterministic chunk identity for (document id, chunk index)
pub fn chunk_identity(document_id: &str, chunk_index: u32) -> String {
    format!("{}#{:05}", document_id, chunk_index)
}

/// The persisted union of chunk, embedding, and document metadata,
/// keyed by chunk identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The chunk
    pub chunk: Chunk,
    /// Embedding vector, dimension fixed per index
    pub embedding: Vec<f32>,
    /// Document title, carried for citations
    pub title: String,
    /// Document file type
    pub file_type: FileType,
    /// Document last-modified timestamp
    pub last_modified: DateTime<Utc>,
}

impl IndexEntry {
    /// Build an entry from a document, one of its chunks, and the
    /// chunk's embedding
    pub fn new(document: &Document, chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk,
            embedding,
            title: document.title.clone(),
            file_type: document.file_type.clone(),
            last_modified: document.last_modified,
        }
    }

    /// Entry id = chunk identity
    pub fn id(&self) -> String {
        self.chunk.identity()
    }
}
