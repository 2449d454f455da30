//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("engine error: {0}")]
  Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<meld_resolve::Error> for ApiError {
  fn from(e: meld_resolve::Error) -> Self {
    use meld_core::Error as Domain;
    match e {
      meld_resolve::Error::Domain(
        err @ (Domain::PersonNotFound(_)
        | Domain::MergeNotFound(_)
        | Domain::SuggestionNotFound(_)),
      ) => Self::NotFound(err.to_string()),
      meld_resolve::Error::Domain(
        err @ (Domain::CannotMergeMe(_)
        | Domain::MergeAlreadyResolved(_)
        | Domain::SelfMerge(_)),
      ) => Self::Conflict(err.to_string()),
      meld_resolve::Error::Domain(err) => Self::BadRequest(err.to_string()),
      meld_resolve::Error::Extract(err) => Self::BadRequest(err.to_string()),
      other => Self::Engine(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Engine(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
