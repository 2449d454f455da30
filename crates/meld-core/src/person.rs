//! Persons — real-world humans, the merge target of identity resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A real-world human represented by a stable ID. At most one person has
/// `is_me = true`; that person is protected from being merged away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub person_id:         Uuid,
  pub canonical_name:    String,
  pub display_name:      Option<String>,
  pub is_me:             bool,
  /// Free-text relation to the user, e.g. `"third_party"`.
  pub relationship_type: Option<String>,
  /// Set when this person was consumed by a merge; the authoritative
  /// "merged away" flag. The canonical-name marker is kept alongside it as
  /// a stable contract for downstream readers.
  pub merged_into:       Option<Uuid>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl Person {
  pub fn is_merged(&self) -> bool { self.merged_into.is_some() }
}

/// Input to [`crate::store::IdentityStore::create_person`].
/// `person_id` and timestamps are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewPerson {
  pub canonical_name:    String,
  pub display_name:      Option<String>,
  pub is_me:             bool,
  pub relationship_type: Option<String>,
}

impl NewPerson {
  pub fn named(canonical_name: impl Into<String>) -> Self {
    Self { canonical_name: canonical_name.into(), ..Self::default() }
  }
}
