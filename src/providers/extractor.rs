//! Extractor trait: raw document bytes to ordered text blocks

use async_trait::async_trait;

use crate::error::Result;
use crate::types::document::FileType;

/// One extracted text block with position metadata
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// 1-indexed page number, when the format has pages
    pub page: Option<u32>,
    /// Block text
    pub text: String,
}

/// Result of extracting a document
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Ordered text blocks
    pub blocks: Vec<TextBlock>,
    /// Non-fatal issues (e.g. pages skipped after OCR failure)
    pub warnings: Vec<String>,
}

impl Extraction {
    /// Concatenate all blocks into the document text handed to the chunker
    pub fn concatenated(&self) -> String {
        let mut text = String::new();
        for block in &self.blocks {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&block.text);
        }
        text
    }

    /// Whether extraction produced any text at all
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.text.trim().is_empty())
    }
}

/// Trait for text/OCR extraction
///
/// Implementations:
/// - `RemoteExtractor`: plain-text formats decoded in-process, image-bearing
///   formats delegated to a remote OCR service
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract ordered text blocks from document bytes
    ///
    /// Per-page OCR failure is non-fatal and surfaces as a warning;
    /// unsupported type or corrupt input fails the whole extraction.
    async fn extract(&self, data: &[u8], file_type: &FileType) -> Result<Extraction>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
