//! Handlers for resolution runs and stats.

use axum::{Json, extract::State};
use meld_core::report::{ResolutionResult, ResolutionStats};
use meld_resolve::ResolutionOptions;
use serde::Deserialize;

use crate::{Engine, error::ApiError};

/// JSON body accepted by `POST /resolution/run`.
#[derive(Debug, Deserialize)]
pub struct RunBody {
  #[serde(default)]
  pub auto_merge:   bool,
  #[serde(default = "default_true")]
  pub include_soft: bool,
  #[serde(default)]
  pub tier1_only:   bool,
}

fn default_true() -> bool { true }

/// `POST /resolution/run`
pub async fn run(
  State(resolver): State<Engine>,
  Json(body): Json<RunBody>,
) -> Result<Json<ResolutionResult>, ApiError> {
  let result = resolver
    .run_full_resolution(ResolutionOptions {
      auto_merge:   body.auto_merge,
      include_soft: body.include_soft,
      tier1_only:   body.tier1_only,
    })
    .await?;
  Ok(Json(result))
}

/// `GET /stats`
pub async fn stats(
  State(resolver): State<Engine>,
) -> Result<Json<ResolutionStats>, ApiError> {
  Ok(Json(resolver.resolution_stats().await?))
}
