//! Provider abstractions for the external collaborators: blob storage,
//! text/OCR extraction, embeddings, and answer generation
//!
//! Each capability sits behind a trait so the pipeline and orchestrator take
//! an explicit dependency bundle and tests can substitute deterministic fakes.

pub mod blob;
pub mod cache;
pub mod embedder;
pub mod extractor;
pub mod generator;
pub mod ollama;
pub mod remote_extractor;
pub mod retry;

pub use blob::{BlobObject, BlobStore, FsBlobStore};
pub use cache::CachedEmbedder;
pub use embedder::Embedder;
pub use extractor::{Extraction, Extractor, TextBlock};
pub use generator::{Generator, Prompt};
pub use ollama::{OllamaEmbedder, OllamaGenerator};
pub use remote_extractor::RemoteExtractor;
pub use retry::RetryPolicy;
