//! Collision and match types returned by the detection queries.

use serde::Serialize;
use uuid::Uuid;

use crate::merge::TriggeringFact;

/// Two or more persons sharing the same value of a given fact type.
#[derive(Debug, Clone, Serialize)]
pub struct FactCollision {
  pub fact_type:      String,
  pub fact_value:     String,
  /// Distinct persons holding this value, in ascending id order.
  pub person_ids:     Vec<Uuid>,
  pub avg_confidence: f64,
}

impl FactCollision {
  /// All unordered pairs within the group, lower id first.
  pub fn pairs(&self) -> impl Iterator<Item = (Uuid, Uuid)> + '_ {
    self.person_ids.iter().enumerate().flat_map(move |(i, &a)| {
      self.person_ids[i + 1..].iter().map(move |&b| (a, b))
    })
  }
}

/// The compound rule a pair of persons matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundRule {
  NameBirthdate,
  NameEmployerLocation,
}

impl CompoundRule {
  /// Exact-value compound matches across independent attributes are strong
  /// signals even without a hard identifier.
  pub fn confidence(&self) -> f64 {
    match self {
      Self::NameBirthdate => 0.90,
      Self::NameEmployerLocation => 0.85,
    }
  }
}

/// A symmetric compound match; `person_a < person_b` always holds.
#[derive(Debug, Clone, Serialize)]
pub struct CompoundMatch {
  pub person_a: Uuid,
  pub person_b: Uuid,
  pub rule:     CompoundRule,
  /// The matched (type, value) evidence.
  pub shared:   Vec<TriggeringFact>,
}

/// An accumulated soft-identifier score for one unordered pair;
/// `person_a < person_b` always holds.
#[derive(Debug, Clone, Serialize)]
pub struct SoftMatch {
  pub person_a: Uuid,
  pub person_b: Uuid,
  pub score:    f64,
  pub evidence: Vec<TriggeringFact>,
}
