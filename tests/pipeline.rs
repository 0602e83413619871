//! End-to-end pipeline and query tests over deterministic fake providers

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use corpus_rag::config::RagConfig;
use corpus_rag::error::{Error, Result};
use corpus_rag::generation::{ContextAssembler, ShortCircuitPolicy};
use corpus_rag::index::{Index, MemoryIndex};
use corpus_rag::ingestion::IngestionPipeline;
use corpus_rag::orchestrator::QueryOrchestrator;
use corpus_rag::providers::blob::{BlobObject, BlobStore};
use corpus_rag::providers::embedder::Embedder;
use corpus_rag::providers::extractor::{Extraction, Extractor, TextBlock};
use corpus_rag::providers::generator::{Generator, Prompt};
use corpus_rag::retrieval::Retriever;
use corpus_rag::types::document::FileType;
use corpus_rag::types::query::{IngestEvent, QueryRequest};
use corpus_rag::types::response::IngestState;

const DIMENSIONS: usize = 16;

/// Blob store over an in-memory map; contents can be swapped between runs
/// to simulate document updates.
struct FakeBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeBlobStore {
    fn new(objects: Vec<(&str, &str)>) -> Self {
        Self {
            objects: Mutex::new(
                objects
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                    .collect(),
            ),
        }
    }

    fn put(&self, location: &str, content: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(location.to_string(), content.as_bytes().to_vec());
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn fetch(&self, location: &str) -> Result<BlobObject> {
        self.objects
            .lock()
            .unwrap()
            .get(location)
            .map(|data| BlobObject {
                data: data.clone(),
                last_modified: Some(Utc::now()),
            })
            .ok_or_else(|| Error::DocumentNotFound(location.to_string()))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Extractor that treats every format as UTF-8 text.
struct FakeExtractor;

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, data: &[u8], _file_type: &FileType) -> Result<Extraction> {
        Ok(Extraction {
            blocks: vec![TextBlock {
                page: None,
                text: String::from_utf8_lossy(data).to_string(),
            }],
            warnings: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Deterministic embedder: words hash into buckets, so texts sharing words
/// land near each other.
struct FakeEmbedder;

fn bucket_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMENSIONS];
    for word in text.split_whitespace() {
        let mut h: u64 = 1469598103934665603;
        for b in word.to_lowercase().bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(1099511628211);
        }
        v[(h % DIMENSIONS as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(bucket_embedding(text))
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Embedder that fails for any text containing a marker word.
struct FailingEmbedder {
    marker: &'static str,
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(self.marker) {
            return Err(Error::embedding("provider rejected chunk"));
        }
        Ok(bucket_embedding(text))
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Generator that counts invocations and echoes a canned answer.
struct CountingGenerator {
    calls: AtomicUsize,
}

impl CountingGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for CountingGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "Based on the provided documents: answer to \"{}\"",
            prompt.query
        ))
    }

    fn name(&self) -> &str {
        "counting"
    }

    fn model(&self) -> &str {
        "fake"
    }
}

fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.embeddings.dimensions = DIMENSIONS;
    config.chunking.max_tokens = 12;
    config.chunking.overlap_tokens = 2;
    config
}

fn pipeline(
    store: Arc<FakeBlobStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<MemoryIndex>,
) -> IngestionPipeline {
    IngestionPipeline::new(
        store,
        Arc::new(FakeExtractor),
        embedder,
        index,
        &test_config(),
    )
}

fn orchestrator(
    index: Arc<MemoryIndex>,
    generator: Arc<CountingGenerator>,
) -> QueryOrchestrator {
    let config = test_config();
    QueryOrchestrator::new(
        Retriever::new(Arc::new(FakeEmbedder), index, config.retrieval.clone()),
        ContextAssembler::new(
            config.generation.context_tokens,
            ShortCircuitPolicy::NoChunks,
        ),
        generator,
    )
}

const HANDBOOK: &str = "Employees accrue vacation at two days per month of service. \
Unused vacation days roll over to the next calendar year up to a cap of ten days. \
Vacation requests must be submitted two weeks in advance to your manager. \
Sick leave is tracked separately from the vacation policy and does not accrue.";

const SECURITY: &str = "All laptops must use full disk encryption and a password manager. \
Report lost devices to the security team within twenty four hours of discovery. \
Production access requires hardware keys issued by the infrastructure group.";

#[tokio::test]
async fn reingesting_an_unchanged_document_is_idempotent() {
    let store = Arc::new(FakeBlobStore::new(vec![("hr/Employee Handbook.pdf", HANDBOOK)]));
    let index = Arc::new(MemoryIndex::new(DIMENSIONS));
    let pipeline = pipeline(store, Arc::new(FakeEmbedder), index.clone());

    let event = IngestEvent::new("hr/Employee Handbook.pdf");
    let first = pipeline.ingest(&event).await;
    let size_after_first = index.len().await.unwrap();
    let second = pipeline.ingest(&event).await;

    assert_eq!(first.state, IngestState::Done);
    assert_eq!(second.state, IngestState::Done);
    assert_eq!(first.chunk_count, second.chunk_count);
    assert_eq!(index.len().await.unwrap(), size_after_first);
    assert_eq!(second.deleted_stale, 0);
}

#[tokio::test]
async fn shrinking_document_deletes_stale_chunks() {
    let store = Arc::new(FakeBlobStore::new(vec![("docs/notes.txt", HANDBOOK)]));
    let index = Arc::new(MemoryIndex::new(DIMENSIONS));
    let pipeline = pipeline(store.clone(), Arc::new(FakeEmbedder), index.clone());

    let event = IngestEvent::new("docs/notes.txt");
    let first = pipeline.ingest(&event).await;
    assert!(first.chunk_count > 1);

    store.put("docs/notes.txt", "Only one small sentence remains.");
    let second = pipeline.ingest(&event).await;

    assert_eq!(second.state, IngestState::Done);
    assert_eq!(second.chunk_count, 1);
    assert_eq!(second.deleted_stale, first.chunk_count - 1);
    assert_eq!(index.len().await.unwrap(), 1);
    assert_eq!(
        index.ids_for_document("docs/notes.txt").await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn partial_embedding_failure_is_contained_per_chunk() {
    let text = "First sentence has ordinary words only here. \
Second sentence contains the poison marker word. \
Third sentence is ordinary again and indexes fine.";
    let store = Arc::new(FakeBlobStore::new(vec![("docs/mixed.txt", text)]));
    let index = Arc::new(MemoryIndex::new(DIMENSIONS));
    let pipeline = pipeline(
        store,
        Arc::new(FailingEmbedder { marker: "poison" }),
        index.clone(),
    );

    let report = pipeline.ingest(&IngestEvent::new("docs/mixed.txt")).await;

    assert_eq!(report.state, IngestState::PartiallyFailed);
    assert!(!report.failed_chunks.is_empty());
    assert!(report.failed_chunks.len() < report.chunk_count);
    assert!(report
        .failed_chunks
        .iter()
        .all(|f| f.error_kind == "embedding_error"));
    // Surviving chunks are still queryable.
    assert_eq!(
        index.len().await.unwrap(),
        report.chunk_count - report.failed_chunks.len()
    );
}

#[tokio::test]
async fn empty_corpus_short_circuits_without_generating() {
    let index = Arc::new(MemoryIndex::new(DIMENSIONS));
    let generator = Arc::new(CountingGenerator::new());
    let orchestrator = orchestrator(index, generator.clone());

    let response = orchestrator
        .query(&QueryRequest::new("What is our vacation policy?"))
        .await
        .unwrap();

    assert_eq!(response.response, "No relevant documents found.");
    assert!(response.sources.is_empty());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn end_to_end_question_cites_the_right_document() {
    let store = Arc::new(FakeBlobStore::new(vec![
        ("hr/Employee Handbook.pdf", HANDBOOK),
        ("it/Security Policy.txt", SECURITY),
    ]));
    let index = Arc::new(MemoryIndex::new(DIMENSIONS));
    let pipeline = pipeline(store, Arc::new(FakeEmbedder), index.clone());

    let handbook = pipeline
        .ingest(&IngestEvent::new("hr/Employee Handbook.pdf"))
        .await;
    let security = pipeline
        .ingest(&IngestEvent::new("it/Security Policy.txt"))
        .await;
    assert_eq!(handbook.state, IngestState::Done);
    assert_eq!(security.state, IngestState::Done);

    let generator = Arc::new(CountingGenerator::new());
    let orchestrator = orchestrator(index, generator.clone());

    let response = orchestrator
        .query(&QueryRequest::new(
            "How many vacation days accrue per month of service?",
        ))
        .await
        .unwrap();

    assert!(!response.response.is_empty());
    assert_eq!(generator.call_count(), 1);
    let titles: Vec<&str> = response.sources.iter().map(|s| s.title.as_str()).collect();
    assert!(titles.contains(&"Employee Handbook.pdf"));
    // Citations are per document, never per chunk.
    let unique: std::collections::HashSet<&str> = titles.iter().copied().collect();
    assert_eq!(unique.len(), titles.len());
}
