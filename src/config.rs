//! Configuration for the RAG system
//!
//! Built once at startup (from a TOML file or defaults) and passed down
//! explicitly; nothing reads process-wide state after construction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::generation::ShortCircuitPolicy;

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Blob storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Extraction/OCR service configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Answer generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Ingestion processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".into()));
        }
        if self.chunking.max_tokens == 0 {
            return Err(Error::Config("chunking.max_tokens must be > 0".into()));
        }
        if self.chunking.overlap_tokens >= self.chunking.max_tokens {
            return Err(Error::Config(
                "chunking.overlap_tokens must be smaller than chunking.max_tokens".into(),
            ));
        }
        if self.generation.context_tokens == 0 {
            return Err(Error::Config("generation.context_tokens must be > 0".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be > 0".into()));
        }
        if self.retrieval.max_per_document == 0 {
            return Err(Error::Config("retrieval.max_per_document must be > 0".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Blob storage configuration (where ingestion triggers resolve locations)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory documents are fetched from
    pub root: PathBuf,
    /// Timeout for a single fetch in seconds
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./documents"),
            timeout_secs: 30,
        }
    }
}

/// Bounded retry with exponential backoff, shared by all provider adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts (1 = no retry)
    pub max_attempts: u32,
    /// Base delay in milliseconds, doubled per attempt
    pub base_delay_ms: u64,
}

impl RetryConfig {
    /// Conservative default for interactive (query-path) calls
    pub fn interactive() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 250,
        }
    }

    /// More aggressive default for ingestion, which is not latency-sensitive
    pub fn ingestion() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
        }
    }

    /// Base delay as a Duration
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Extraction/OCR service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Base URL of the OCR/extraction service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retry policy for transient service errors
    #[serde(default = "RetryConfig::ingestion")]
    pub retry: RetryConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            timeout_secs: 120,
            retry: RetryConfig::ingestion(),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service (Ollama-compatible)
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions, fixed for the whole index
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Cache embeddings by content hash
    pub cache: bool,
    /// Retry policy for transient provider errors
    #[serde(default = "RetryConfig::ingestion")]
    pub retry: RetryConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            timeout_secs: 60,
            cache: true,
            retry: RetryConfig::ingestion(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens
    pub max_tokens: usize,
    /// Overlap between consecutive chunks in tokens
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap_tokens: 50,
        }
    }
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the generation service (Ollama-compatible)
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Input token budget for the assembled context
    pub context_tokens: usize,
    /// Retry policy, kept small to protect interactive latency
    #[serde(default = "RetryConfig::interactive")]
    pub retry: RetryConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            context_tokens: 3000,
            retry: RetryConfig::interactive(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks returned to the context assembler
    pub top_k: usize,
    /// Oversampling factor applied before the diversity cap
    pub oversample: usize,
    /// Maximum chunks a single document may contribute
    pub max_per_document: usize,
    /// When to answer "no relevant documents found" without invoking
    /// the generator
    #[serde(default)]
    pub short_circuit: ShortCircuitPolicy,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            oversample: 3,
            max_per_document: 3,
            short_circuit: ShortCircuitPolicy::default(),
        }
    }
}

/// Ingestion processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of document-parallel workers (default: CPU count, max 4)
    pub workers: Option<usize>,
    /// Concurrent embedding calls per document
    pub parallel_embeddings: usize,
    /// Queue capacity for pending ingestion triggers
    pub queue_capacity: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: None,
            parallel_embeddings: 4,
            queue_capacity: 1024,
        }
    }
}

impl ProcessingConfig {
    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| num_cpus::get().min(4)).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        RagConfig::default().validate().unwrap();
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.chunking.max_tokens = 50;
        config.chunking.overlap_tokens = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_short_circuit_policy_from_toml() {
        let config: RagConfig = toml::from_str(
            r#"
            [retrieval]
            top_k = 8
            oversample = 3
            max_per_document = 2

            [retrieval.short_circuit]
            mode = "min_score"
            threshold = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.top_k, 8);
        assert!(matches!(
            config.retrieval.short_circuit,
            ShortCircuitPolicy::MinScore { threshold } if (threshold - 0.25).abs() < f32::EPSILON
        ));
    }
}
