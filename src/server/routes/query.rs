//! Query endpoint with RAG and citations

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::query::QueryRequest;
use crate::types::response::QueryResponse;

/// POST /query - Answer a question over the indexed corpus
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    tracing::info!("Query: \"{}\"", request.query);

    let response = state.orchestrator().query(&request).await?;

    tracing::info!(
        "Query completed in {}ms, {} sources",
        start.elapsed().as_millis(),
        response.sources.len()
    );

    Ok(Json(response))
}
