//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::ContextAssembler;
use crate::index::{Index, MemoryIndex};
use crate::ingestion::IngestionPipeline;
use crate::orchestrator::QueryOrchestrator;
use crate::processing::{spawn_workers, IngestQueue};
use crate::providers::blob::{BlobStore, FsBlobStore};
use crate::providers::cache::CachedEmbedder;
use crate::providers::embedder::Embedder;
use crate::providers::extractor::Extractor;
use crate::providers::generator::Generator;
use crate::providers::ollama::{OllamaEmbedder, OllamaGenerator};
use crate::providers::remote_extractor::RemoteExtractor;
use crate::retrieval::Retriever;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    orchestrator: QueryOrchestrator,
    queue: IngestQueue,
    index: Arc<dyn Index>,
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state wired to the configured providers
    pub async fn new(config: RagConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!("Initializing RAG application state...");

        let blob_store: Arc<dyn BlobStore> =
            Arc::new(FsBlobStore::new(config.storage.root.clone()));
        let extractor: Arc<dyn Extractor> =
            Arc::new(RemoteExtractor::new(&config.extraction)?);

        let embedder: Arc<dyn Embedder> = if config.embeddings.cache {
            Arc::new(CachedEmbedder::new(OllamaEmbedder::new(&config.embeddings)?))
        } else {
            Arc::new(OllamaEmbedder::new(&config.embeddings)?)
        };
        tracing::info!(
            "Embedder initialized (model: {}, {} dimensions, cache: {})",
            config.embeddings.model,
            config.embeddings.dimensions,
            config.embeddings.cache
        );

        let index: Arc<dyn Index> = Arc::new(MemoryIndex::new(config.embeddings.dimensions));
        let generator: Arc<dyn Generator> = Arc::new(OllamaGenerator::new(&config.generation)?);
        tracing::info!("Generator initialized (model: {})", config.generation.model);

        let state = Self::with_providers(config, blob_store, extractor, embedder, index, generator);

        // Queries and ingestion fail until the embedding provider answers;
        // /ready reports unavailable until the check sees it up.
        state.set_ready(false);
        state.clone().spawn_readiness_check();

        Ok(state)
    }

    /// Poll the embedding provider until it answers, then mark the state
    /// ready. Keeps retrying so a provider that comes up late still flips
    /// /ready to 200.
    fn spawn_readiness_check(self) {
        let url = format!("{}/api/tags", self.config().embeddings.base_url);
        tokio::spawn(async move {
            let client = reqwest::Client::new();
            loop {
                let outcome = client
                    .get(&url)
                    .timeout(std::time::Duration::from_secs(2))
                    .send()
                    .await;
                match outcome {
                    Ok(resp) if resp.status().is_success() => {
                        tracing::info!("Embedding provider is reachable, marking ready");
                        self.set_ready(true);
                        return;
                    }
                    _ => {
                        tracing::warn!(
                            "Embedding provider not reachable at {}; ingestion and \
                             queries will fail until it is up",
                            url
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    /// Assemble state from explicit providers. Tests inject fakes here;
    /// production wiring goes through [`AppState::new`].
    pub fn with_providers(
        config: RagConfig,
        blob_store: Arc<dyn BlobStore>,
        extractor: Arc<dyn Extractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn Index>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let pipeline = Arc::new(IngestionPipeline::new(
            blob_store,
            extractor,
            embedder.clone(),
            index.clone(),
            &config,
        ));

        let (queue, receiver) = IngestQueue::new(config.processing.queue_capacity);
        spawn_workers(
            pipeline,
            receiver,
            queue.clone(),
            config.processing.worker_count(),
        );

        let retriever = Retriever::new(embedder, index.clone(), config.retrieval.clone());
        let assembler = ContextAssembler::new(
            config.generation.context_tokens,
            config.retrieval.short_circuit.clone(),
        );
        let orchestrator = QueryOrchestrator::new(retriever, assembler, generator);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator,
                queue,
                index,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the query orchestrator
    pub fn orchestrator(&self) -> &QueryOrchestrator {
        &self.inner.orchestrator
    }

    /// Get the ingestion queue
    pub fn queue(&self) -> &IngestQueue {
        &self.inner.queue
    }

    /// Get the index
    pub fn index(&self) -> &Arc<dyn Index> {
        &self.inner.index
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
