//! Handlers for merge review.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/merges` | Pending proposals with canonical names resolved |
//! | `POST` | `/merges/:id/accept` | Executes (or vetoes) the merge as the user |
//! | `POST` | `/merges/:id/reject` | Marks rejected; persons untouched |

use axum::{
  Json,
  extract::{Path, State},
};
use meld_core::merge::PendingMerge;
use meld_resolve::merge::MergeOutcome;
use serde_json::json;
use uuid::Uuid;

use crate::{Engine, error::ApiError};

/// `GET /merges`
pub async fn list_pending(
  State(resolver): State<Engine>,
) -> Result<Json<Vec<PendingMerge>>, ApiError> {
  Ok(Json(resolver.pending_merges().await?))
}

/// `POST /merges/:id/accept` — runs the full execution path, conflict veto
/// included. A veto is reported, not an error.
pub async fn accept(
  State(resolver): State<Engine>,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let outcome = match resolver.accept_merge(id).await? {
    MergeOutcome::Executed => "executed",
    MergeOutcome::Vetoed => "vetoed",
  };
  Ok(Json(json!({ "outcome": outcome })))
}

/// `POST /merges/:id/reject`
pub async fn reject(
  State(resolver): State<Engine>,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
  resolver.reject_merge(id).await?;
  Ok(Json(json!({ "outcome": "rejected" })))
}
