//! API routes for the RAG server

pub mod documents;
pub mod ingest;
pub mod query;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::query_rag))
        .route("/ingest", post(ingest::submit_ingest))
        .route("/ingest/report", get(ingest::ingest_report))
        .route("/documents", get(documents::list_documents))
}
