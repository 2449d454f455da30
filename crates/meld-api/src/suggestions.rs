//! Handlers for heuristic suggestion review.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use meld_core::{
  store::IdentityStore as _,
  suggestion::{MergeSuggestion, SuggestionStatus},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{Engine, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Restrict to one status, e.g. `?status=pending`.
  pub status: Option<SuggestionStatus>,
}

/// `GET /suggestions[?status=...]`
pub async fn list(
  State(resolver): State<Engine>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<MergeSuggestion>>, ApiError> {
  let suggestions = resolver
    .store()
    .list_suggestions(params.status)
    .await
    .map_err(|e| ApiError::Engine(Box::new(e)))?;
  Ok(Json(suggestions))
}

/// `POST /suggestions/generate`
pub async fn generate(
  State(resolver): State<Engine>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let created = resolver.generate_suggestions().await?;
  Ok(Json(json!({ "created": created })))
}

/// `POST /suggestions/cleanup` — expire suggestions whose persons are gone.
pub async fn cleanup(
  State(resolver): State<Engine>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let expired = resolver.cleanup_expired_suggestions().await?;
  Ok(Json(json!({ "expired": expired })))
}

/// `POST /suggestions/:id/accept` — merges person2 into person1, then marks
/// the suggestion accepted.
pub async fn accept(
  State(resolver): State<Engine>,
  Path(id): Path<Uuid>,
) -> Result<Json<MergeSuggestion>, ApiError> {
  Ok(Json(resolver.accept_suggestion(id).await?))
}

/// `POST /suggestions/:id/reject`
pub async fn reject(
  State(resolver): State<Engine>,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
  resolver.reject_suggestion(id).await?;
  Ok(Json(json!({ "outcome": "rejected" })))
}
