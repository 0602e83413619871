//! Document listing endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::Index;
use crate::server::state::AppState;
use crate::types::response::IngestState;

/// Summary of an ingested document
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document id (source location)
    pub id: String,
    /// Display title
    pub title: String,
    /// Chunks currently indexed for the document
    pub chunk_count: usize,
    /// Terminal state of the latest ingestion run
    pub state: IngestState,
}

/// GET /documents - Documents known to the system, from ingestion reports
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentSummary>>> {
    let mut summaries: Vec<DocumentSummary> = Vec::new();

    for report in state.queue().reports() {
        let chunk_count = state
            .index()
            .ids_for_document(&report.document_id)
            .await?
            .len();
        let title = report
            .document_id
            .rsplit('/')
            .next()
            .unwrap_or(&report.document_id)
            .to_string();
        summaries.push(DocumentSummary {
            id: report.document_id,
            title,
            chunk_count,
            state: report.state,
        });
    }

    summaries.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(Json(summaries))
}
