//! Ingestion trigger and report endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::query::IngestEvent;
use crate::types::response::IngestReport;

/// Response for an accepted ingestion trigger
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestAccepted {
    /// Job id for the queued run
    pub job_id: Uuid,
    /// Document location the job will process
    pub location: String,
}

/// POST /ingest - Queue a document for background ingestion
pub async fn submit_ingest(
    State(state): State<AppState>,
    Json(event): Json<IngestEvent>,
) -> Result<(StatusCode, Json<IngestAccepted>)> {
    if event.location.trim().is_empty() {
        return Err(Error::validation("location must not be empty"));
    }

    let location = event.location.clone();
    let job_id = state.queue().submit(event)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestAccepted { job_id, location }),
    ))
}

/// Query parameters for the report endpoint. Document ids contain slashes,
/// so the id travels as a query parameter, not a path segment.
#[derive(Debug, Deserialize)]
pub struct ReportParams {
    pub location: String,
}

/// GET /ingest/report?location=... - Latest report for a document
pub async fn ingest_report(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<Json<IngestReport>> {
    state
        .queue()
        .report(&params.location)
        .map(Json)
        .ok_or_else(|| Error::DocumentNotFound(params.location))
}
