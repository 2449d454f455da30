//! Error type for `meld-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] meld_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored discriminant or timestamp failed to decode.
  #[error("column decode error: {0}")]
  Decode(String),

  #[error("person not found: {0}")]
  PersonNotFound(Uuid),

  #[error("merge event not found: {0}")]
  MergeNotFound(Uuid),

  #[error("merge event {0} is already resolved")]
  MergeAlreadyResolved(Uuid),

  #[error("suggestion not found: {0}")]
  SuggestionNotFound(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
