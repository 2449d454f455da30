//! Error type for `meld-extract`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The top-level JSON was neither an object nor an array of objects.
  #[error("unexpected analyzer output shape: {0}")]
  UnexpectedShape(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
