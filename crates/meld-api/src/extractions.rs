//! Handler for `POST /extractions` — analyzer output ingestion.

use axum::{Json, extract::State};
use meld_core::report::SyncStats;

use crate::{Engine, error::ApiError};

/// `POST /extractions` — body is raw analyzer output: one document or an
/// array of documents.
pub async fn ingest(
  State(resolver): State<Engine>,
  Json(body): Json<serde_json::Value>,
) -> Result<Json<SyncStats>, ApiError> {
  let stats = resolver.ingest_json(&body.to_string()).await?;
  Ok(Json(stats))
}
