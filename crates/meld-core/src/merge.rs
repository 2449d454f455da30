//! Merge events — proposed or executed unions of two person records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of evidence proposed this merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeType {
  HardIdentifier,
  Compound,
  SoftAccumulation,
  Manual,
}

impl MergeType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::HardIdentifier => "hard_identifier",
      Self::Compound => "compound",
      Self::SoftAccumulation => "soft_accumulation",
      Self::Manual => "manual",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStatus {
  Pending,
  Accepted,
  Rejected,
  Executed,
}

impl MergeStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Accepted => "accepted",
      Self::Rejected => "rejected",
      Self::Executed => "executed",
    }
  }
}

/// A (type, value) pair recorded as evidence for a merge proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeringFact {
  pub fact_type:  String,
  pub fact_value: String,
}

/// A proposed or executed union of two persons. At most one merge event
/// exists per unordered person pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeEvent {
  pub merge_id:         Uuid,
  pub source_person_id: Uuid,
  pub target_person_id: Uuid,
  pub merge_type:       MergeType,
  pub triggering_facts: Vec<TriggeringFact>,
  pub similarity_score: f64,
  pub status:           MergeStatus,
  pub auto_eligible:    bool,
  pub created_at:       DateTime<Utc>,
  pub resolved_at:      Option<DateTime<Utc>>,
  pub resolved_by:      Option<String>,
}

/// Input to [`crate::store::IdentityStore::insert_merge_event`]; the event
/// is created `pending`.
#[derive(Debug, Clone)]
pub struct NewMergeEvent {
  pub source_person_id: Uuid,
  pub target_person_id: Uuid,
  pub merge_type:       MergeType,
  pub triggering_facts: Vec<TriggeringFact>,
  pub similarity_score: f64,
  pub auto_eligible:    bool,
}

/// A pending merge bundled with both canonical names, for review surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct PendingMerge {
  pub merge:       MergeEvent,
  pub source_name: String,
  pub target_name: String,
}

// ─── Pair ordering ───────────────────────────────────────────────────────────

/// An unordered person pair stored in canonical (min, max) order — the
/// dedup key shared by merge events and suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersonPair {
  lo: Uuid,
  hi: Uuid,
}

impl PersonPair {
  pub fn new(a: Uuid, b: Uuid) -> Self {
    if a <= b { Self { lo: a, hi: b } } else { Self { lo: b, hi: a } }
  }

  pub fn lo(&self) -> Uuid { self.lo }

  pub fn hi(&self) -> Uuid { self.hi }
}

// ─── Merge marker ────────────────────────────────────────────────────────────

/// Prefix of the marker appended to a consumed person's canonical name.
/// This string is a stable contract: downstream consumers match on it.
pub const MERGE_MARKER_PREFIX: &str = " [MERGED→";

/// The full marker for a merge into `target`, e.g. `" [MERGED→1b9d6bcd]"`.
pub fn merge_marker(target: Uuid) -> String {
  let hyphenated = target.hyphenated().to_string();
  format!("{MERGE_MARKER_PREFIX}{}]", &hyphenated[..8])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pair_is_order_insensitive() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    assert_eq!(PersonPair::new(a, b), PersonPair::new(b, a));
    assert!(PersonPair::new(a, b).lo() <= PersonPair::new(a, b).hi());
  }

  #[test]
  fn marker_uses_first_eight_of_target() {
    let target = Uuid::parse_str("1b9d6bcd-bbfd-4b2d-9b5d-ab8dfbbd4bed").unwrap();
    assert_eq!(merge_marker(target), " [MERGED→1b9d6bcd]");
  }
}
