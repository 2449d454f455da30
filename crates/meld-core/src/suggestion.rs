//! Heuristic merge suggestions — the lower-confidence proposal stream,
//! surfaced to human reviewers.
//!
//! Suggestions are independent of [`crate::merge::MergeEvent`]s: both use
//! the unordered-pair dedup pattern but serve different populations
//! (heuristic vs algorithmic) and share no rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The heuristic that produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionEvidenceType {
  NameSimilarity,
  SharedDomain,
  CoOccurrence,
}

impl SuggestionEvidenceType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NameSimilarity => "name_similarity",
      Self::SharedDomain => "shared_domain",
      Self::CoOccurrence => "co_occurrence",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
  Pending,
  Accepted,
  Rejected,
  Expired,
}

impl SuggestionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Accepted => "accepted",
      Self::Rejected => "rejected",
      Self::Expired => "expired",
    }
  }
}

/// A heuristic suggestion that two persons may be the same human.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSuggestion {
  pub suggestion_id:       Uuid,
  pub person1_id:          Uuid,
  pub person2_id:          Uuid,
  pub evidence_type:       SuggestionEvidenceType,
  /// Opaque JSON payload describing the evidence (matched names, shared
  /// domains, …); reviewers read it, the engine does not.
  pub evidence:            serde_json::Value,
  pub confidence:          f64,
  pub person1_event_count: i64,
  pub person2_event_count: i64,
  pub status:              SuggestionStatus,
  pub created_at:          DateTime<Utc>,
  pub reviewed_at:         Option<DateTime<Utc>>,
}

/// Input to [`crate::store::IdentityStore::insert_suggestion`].
#[derive(Debug, Clone)]
pub struct NewSuggestion {
  pub person1_id:          Uuid,
  pub person2_id:          Uuid,
  pub evidence_type:       SuggestionEvidenceType,
  pub evidence:            serde_json::Value,
  pub confidence:          f64,
  pub person1_event_count: i64,
  pub person2_event_count: i64,
}
