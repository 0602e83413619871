//! RAG server binary
//!
//! Run with: cargo run --bin corpus-rag-server [config.toml]

use corpus_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpus_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path);
            RagConfig::from_file(&path)?
        }
        None => RagConfig::default(),
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - Generation model: {}", config.generation.model);
    tracing::info!("  - Chunk size: {} tokens", config.chunking.max_tokens);
    tracing::info!("  - Document root: {}", config.storage.root.display());

    let server = RagServer::new(config).await?;
    tracing::info!("Listening on http://{}", server.address());
    server.start().await?;

    Ok(())
}
