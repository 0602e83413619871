//! Ingestion worker pool
//!
//! Workers pull triggers off a shared receiver and run the pipeline.
//! Parallelism across documents comes from the pool size; the pipeline's
//! per-document lock keeps concurrent triggers for one document serialized.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::ingestion::IngestionPipeline;
use crate::types::query::IngestEvent;

use super::queue::IngestQueue;

/// Spawn `count` workers draining the receiver into the pipeline
pub fn spawn_workers(
    pipeline: Arc<IngestionPipeline>,
    receiver: mpsc::Receiver<IngestEvent>,
    queue: IngestQueue,
    count: usize,
) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));
    let count = count.max(1);
    tracing::info!("Starting {} ingestion workers", count);

    (0..count)
        .map(|worker_id| {
            let receiver = receiver.clone();
            let pipeline = pipeline.clone();
            let queue = queue.clone();

            tokio::spawn(async move {
                loop {
                    // Hold the receiver lock only for the recv; the actual
                    // run happens with it released so other workers keep
                    // draining.
                    let event = { receiver.lock().await.recv().await };
                    let Some(event) = event else {
                        tracing::debug!("Worker {} shutting down", worker_id);
                        break;
                    };

                    let report = pipeline.ingest(&event).await;
                    queue.store_report(report);
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::error::Result;
    use crate::index::{Index, MemoryIndex};
    use crate::providers::blob::{BlobObject, BlobStore};
    use crate::providers::embedder::Embedder;
    use crate::providers::extractor::{Extraction, Extractor, TextBlock};
    use crate::types::document::FileType;
    use crate::types::response::IngestState;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;

    struct StaticStore;

    #[async_trait]
    impl BlobStore for StaticStore {
        async fn fetch(&self, _location: &str) -> Result<BlobObject> {
            Ok(BlobObject {
                data: b"Some words to index here.".to_vec(),
                last_modified: Some(Utc::now()),
            })
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    struct Utf8Extractor;

    #[async_trait]
    impl Extractor for Utf8Extractor {
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
            "utf8"
        }
    }

    struct OnesEmbedder;

    #[async_trait]
    impl Embedder for OnesEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "ones"
        }
    }

    #[tokio::test]
    async fn workers_drain_the_queue_and_store_reports() {
        let index = Arc::new(MemoryIndex::new(2));
        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::new(StaticStore),
            Arc::new(Utf8Extractor),
            Arc::new(OnesEmbedder),
            index.clone(),
            &RagConfig::default(),
        ));

        let (queue, receiver) = IngestQueue::new(8);
        let handles = spawn_workers(pipeline, receiver, queue.clone(), 2);

        queue.submit(IngestEvent::new("docs/a.txt")).unwrap();
        queue.submit(IngestEvent::new("docs/b.txt")).unwrap();

        // Poll until both runs finish.
        for _ in 0..50 {
            let done = queue
                .reports()
                .iter()
                .filter(|r| r.state == IngestState::Done)
                .count();
            if done == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(
            queue
                .reports()
                .iter()
                .filter(|r| r.state == IngestState::Done)
                .count(),
            2
        );
        assert!(index.len().await.unwrap() > 0);

        for handle in handles {
            handle.abort();
        }
    }
}
