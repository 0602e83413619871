//! Query orchestration
//!
//! One query runs embed, hybrid retrieval, context assembly, generation,
//! citation extraction. The path is stateless; any number of queries run
//! concurrently against the shared index.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::generation::{build_citations, ContextAssembler, PromptBuilder};
use crate::providers::generator::Generator;
use crate::retrieval::Retriever;
use crate::types::query::QueryRequest;
use crate::types::response::QueryResponse;

/// End-to-end query orchestrator
pub struct QueryOrchestrator {
    retriever: Retriever,
    assembler: ContextAssembler,
    generator: Arc<dyn Generator>,
}

impl QueryOrchestrator {
    /// Create an orchestrator over the retrieval and generation stages
    pub fn new(
        retriever: Retriever,
        assembler: ContextAssembler,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            retriever,
            assembler,
            generator,
        }
    }

    /// Answer a query with citations
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        if request.query.trim().is_empty() {
            return Err(Error::validation("query must not be empty"));
        }

        let started = Instant::now();
        let retrieved = self.retriever.retrieve(request).await?;
        tracing::debug!(
            "Retrieved {} chunks in {:?}",
            retrieved.len(),
            started.elapsed()
        );

        if self.assembler.should_short_circuit(&retrieved) {
            tracing::info!("No relevant chunks for query, skipping generation");
            return Ok(QueryResponse::no_relevant_documents(request.query.clone()));
        }

        let selected = self.assembler.assemble(&retrieved);
        if selected.is_empty() {
            // Every retrieved chunk was over the context budget.
            tracing::warn!("Context budget admitted no chunks, skipping generation");
            return Ok(QueryResponse::no_relevant_documents(request.query.clone()));
        }

        let prompt = PromptBuilder::build(&selected, &request.query);
        let answer = self.generator.generate(&prompt).await?;
        let sources = build_citations(&selected);

        tracing::info!(
            "Answered query with {} sources in {:?}",
            sources.len(),
            started.elapsed()
        );

        Ok(QueryResponse::new(request.query.clone(), answer, sources))
    }
}
