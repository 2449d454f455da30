//! Error type for `meld-resolve`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An error surfaced by the storage backend.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Domain(#[from] meld_core::Error),

  #[error("extraction parse error: {0}")]
  Extract(#[from] meld_extract::Error),
}

impl Error {
  /// Box a backend error; used at every store-call boundary.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
