//! Error types for `meld-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::identifier::IdentifierKind;

#[derive(Debug, Error)]
pub enum Error {
  /// The raw identifier normalised to the empty string and was rejected
  /// before touching the registry.
  #[error("invalid {kind} identifier: {raw:?}")]
  InvalidIdentifier { kind: IdentifierKind, raw: String },

  #[error("unknown fact category: {0:?}")]
  UnknownCategory(String),

  #[error("person not found: {0}")]
  PersonNotFound(Uuid),

  #[error("merge event not found: {0}")]
  MergeNotFound(Uuid),

  #[error("suggestion not found: {0}")]
  SuggestionNotFound(Uuid),

  /// A merge proposal referenced the same person on both sides.
  #[error("cannot merge a person into itself: {0}")]
  SelfMerge(Uuid),

  /// The is-me person may only ever be a merge target.
  #[error("person {0} is the user and cannot be merged away")]
  CannotMergeMe(Uuid),

  /// The merge event is not in `pending` status.
  #[error("merge event {0} is already resolved")]
  MergeAlreadyResolved(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
