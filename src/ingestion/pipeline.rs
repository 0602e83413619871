//! The per-document ingestion pipeline
//!
//! One run moves a document through fetch, extract, chunk, embed, index,
//! reconcile. Failures below the document level (a single chunk's
//! embedding, one index write) are recorded in the report and do not abort
//! the run; document-level failures (fetch, extraction) do.
//!
//! Runs for different documents proceed in parallel; runs for the same
//! document are serialized through a per-document mutex, so a redelivered
//! trigger queues behind the in-flight run instead of racing it.

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::providers::blob::BlobStore;
use crate::providers::embedder::Embedder;
use crate::providers::extractor::Extractor;
use crate::types::document::{Document, IndexEntry};
use crate::types::query::IngestEvent;
use crate::types::response::{ChunkFailure, IngestReport};

use super::chunker::TextChunker;

/// Ingestion pipeline for a document corpus
pub struct IngestionPipeline {
    blob_store: Arc<dyn BlobStore>,
    extractor: Arc<dyn Extractor>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn Index>,
    chunker: TextChunker,
    parallel_embeddings: usize,
    fetch_timeout: Duration,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl IngestionPipeline {
    /// Assemble a pipeline over the given providers
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        extractor: Arc<dyn Extractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn Index>,
        config: &RagConfig,
    ) -> Self {
        Self {
            blob_store,
            extractor,
            embedder,
            index,
            chunker: TextChunker::new(&config.chunking),
            parallel_embeddings: config.processing.parallel_embeddings.max(1),
            fetch_timeout: Duration::from_secs(config.storage.timeout_secs),
            locks: DashMap::new(),
        }
    }

    /// Ingest one document. Never returns an error; every outcome,
    /// including document-level failure, lands in the report.
    pub async fn ingest(&self, event: &IngestEvent) -> IngestReport {
        let lock = self
            .locks
            .entry(event.location.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let report = {
            let _guard = lock.lock().await;

            let mut report = IngestReport::new(&event.location);
            tracing::info!("Ingesting document {}", event.location);

            if let Err(e) = self.run(event, &mut report).await {
                tracing::error!("Ingestion of {} failed: {}", event.location, e);
                report.fail(e.to_string());
            }

            report
        };

        // Evict the lock entry once no other run holds a clone, so the map
        // does not grow with every document ever ingested. A concurrent
        // redelivery keeps the strong count above one and the entry stays.
        drop(lock);
        self.locks
            .remove_if(&event.location, |_, l| Arc::strong_count(l) == 1);

        report
    }

    async fn run(&self, event: &IngestEvent, report: &mut IngestReport) -> Result<()> {
        use crate::types::response::IngestState;

        let file_type = event.file_type();
        if !file_type.is_supported() {
            return Err(Error::UnsupportedFileType(event.location.clone()));
        }

        let blob = tokio::time::timeout(self.fetch_timeout, self.blob_store.fetch(&event.location))
            .await
            .map_err(|_| {
                Error::internal(format!("fetch of {} timed out", event.location))
            })??;

        report.state = IngestState::Extracting;
        let extraction = self.extractor.extract(&blob.data, &file_type).await?;
        report.warnings.extend(extraction.warnings.clone());

        let document = Document::from_location(
            &event.location,
            file_type,
            blob.last_modified.unwrap_or_else(Utc::now),
        );
        let text = extraction.concatenated();

        report.state = IngestState::Chunking;
        let chunks = self.chunker.chunk(&document.id, &text);
        report.chunk_count = chunks.len();
        tracing::debug!("Document {} produced {} chunks", document.id, chunks.len());

        if chunks.is_empty() {
            report
                .warnings
                .push("document produced no indexable text".to_string());
        }

        // Identities of every chunk this run produced, indexed or not.
        // Reconciliation diffs the index against this set, so an entry whose
        // chunk failed this run keeps its previous content instead of being
        // deleted.
        let expected: HashSet<String> = chunks.iter().map(|c| c.identity()).collect();

        report.state = IngestState::Embedding;
        let embedder = &self.embedder;
        let embedded: Vec<_> = stream::iter(chunks.into_iter().map(|chunk| async move {
            let embedding = embedder.embed(&chunk.text).await;
            (chunk, embedding)
        }))
        .buffered(self.parallel_embeddings)
        .collect()
        .await;

        report.state = IngestState::Indexing;
        for (chunk, embedding) in embedded {
            let chunk_index = chunk.chunk_index;
            let outcome = match embedding {
                Ok(vector) => {
                    let entry = IndexEntry::new(&document, chunk, vector);
                    self.index.upsert(vec![entry]).await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                tracing::warn!(
                    "Chunk {} of {} failed: {}",
                    chunk_index,
                    document.id,
                    e
                );
                report.failed_chunks.push(ChunkFailure {
                    chunk_index,
                    error_kind: e.kind().to_string(),
                });
            }
        }

        // A shrinking document leaves entries beyond the new chunk count;
        // delete them so retrieval never serves removed content.
        let existing = self.index.ids_for_document(&document.id).await?;
        let stale: Vec<String> = existing
            .into_iter()
            .filter(|id| !expected.contains(id))
            .collect();
        if !stale.is_empty() {
            report.deleted_stale = self.index.delete(&stale).await?;
            tracing::info!(
                "Reconciled {}: deleted {} stale entries",
                document.id,
                report.deleted_stale
            );
        }

        report.finish();
        Ok(())
    }
}
