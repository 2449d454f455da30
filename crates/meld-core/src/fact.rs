//! Person facts — strongly-typed, deduplicated claims about persons.
//!
//! A fact is unique per (person, category, type, value). Re-inserting an
//! existing fact raises its confidence monotonically and fills in missing
//! provenance; it never lowers anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Categories ──────────────────────────────────────────────────────────────

/// The closed set of fact categories accepted at the ingestion boundary.
/// Unknown category strings are an input error and the offending row is
/// skipped, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
  ContactInformation,
  Personal,
  Professional,
  Relationship,
  Location,
  Education,
  Financial,
  Health,
  Legal,
  OnlinePresence,
  Preference,
  Other,
}

impl FactCategory {
  /// The discriminant string stored in the `category` column.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ContactInformation => "contact_information",
      Self::Personal => "personal",
      Self::Professional => "professional",
      Self::Relationship => "relationship",
      Self::Location => "location",
      Self::Education => "education",
      Self::Financial => "financial",
      Self::Health => "health",
      Self::Legal => "legal",
      Self::OnlinePresence => "online_presence",
      Self::Preference => "preference",
      Self::Other => "other",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "contact_information" => Ok(Self::ContactInformation),
      "personal" => Ok(Self::Personal),
      "professional" => Ok(Self::Professional),
      "relationship" => Ok(Self::Relationship),
      "location" => Ok(Self::Location),
      "education" => Ok(Self::Education),
      "financial" => Ok(Self::Financial),
      "health" => Ok(Self::Health),
      "legal" => Ok(Self::Legal),
      "online_presence" => Ok(Self::OnlinePresence),
      "preference" => Ok(Self::Preference),
      "other" => Ok(Self::Other),
      other => Err(Error::UnknownCategory(other.to_owned())),
    }
  }
}

// ─── Identifier classes ──────────────────────────────────────────────────────

/// Fact types that uniquely name a person in the world. A collision on any
/// of these is Tier-1 evidence for a merge.
pub const HARD_IDENTIFIER_TYPES: &[&str] = &[
  "email_personal",
  "email_work",
  "email_school",
  "phone_mobile",
  "phone_home",
  "phone_work",
  "full_legal_name",
  "social_twitter",
  "social_instagram",
  "social_linkedin",
  "social_facebook",
  "social_tiktok",
  "social_reddit",
  "social_discord",
  "generic_username",
  "ssn",
  "passport_number",
  "drivers_license",
];

/// Soft identifier types and their accumulation weights. Individually
/// ambiguous, collectively informative.
pub const SOFT_IDENTIFIER_WEIGHTS: &[(&str, f64)] = &[
  ("employer_current", 0.20),
  ("location_current", 0.15),
  ("profession", 0.15),
  ("spouse_first_name", 0.25),
  ("school_attended", 0.15),
  ("birthdate", 0.25),
];

pub fn is_hard_identifier(fact_type: &str) -> bool {
  HARD_IDENTIFIER_TYPES.contains(&fact_type)
}

/// Strong identifiers promote third-party references to persons: the hard
/// set minus `full_legal_name` (a name alone is not unique in the world).
pub fn is_strong_identifier(fact_type: &str) -> bool {
  fact_type != "full_legal_name" && is_hard_identifier(fact_type)
}

pub fn soft_weight(fact_type: &str) -> Option<f64> {
  SOFT_IDENTIFIER_WEIGHTS
    .iter()
    .find(|(t, _)| *t == fact_type)
    .map(|(_, w)| *w)
}

pub fn is_identifier(fact_type: &str) -> bool {
  is_hard_identifier(fact_type) || soft_weight(fact_type).is_some()
}

/// Fact types whose differing values on two persons are a hard
/// contradiction that vetoes an automatic merge.
pub const CONFLICT_VETO_TYPES: &[&str] =
  &["birthdate", "ssn", "passport_number", "drivers_license"];

/// Default sensitivity: government identifiers and anything filed under the
/// health, financial, or legal categories.
pub fn default_sensitivity(category: FactCategory, fact_type: &str) -> bool {
  matches!(
    category,
    FactCategory::Health | FactCategory::Financial | FactCategory::Legal
  ) || matches!(fact_type, "ssn" | "passport_number" | "drivers_license")
}

// ─── PersonFact ──────────────────────────────────────────────────────────────

/// A stored claim about a person. Unique by (person_id, category,
/// fact_type, fact_value); the identifier flags are derived from
/// `fact_type` at insert time, never supplied by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonFact {
  pub fact_id:            Uuid,
  pub person_id:          Uuid,
  pub category:           FactCategory,
  pub fact_type:          String,
  pub fact_value:         String,
  pub confidence:         f64,
  /// Which subsystem produced this fact, e.g. `"extraction"`.
  pub source_type:        String,
  pub source_channel:     Option<String>,
  pub source_segment:     Option<String>,
  pub source_facet_id:    Option<String>,
  pub evidence:           Option<String>,
  pub is_sensitive:       bool,
  pub is_identifier:      bool,
  pub is_hard_identifier: bool,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

/// Input to [`crate::store::IdentityStore::insert_fact`].
#[derive(Debug, Clone)]
pub struct NewFact {
  pub person_id:       Uuid,
  pub category:        FactCategory,
  pub fact_type:       String,
  pub fact_value:      String,
  pub confidence:      f64,
  pub source_type:     String,
  pub source_channel:  Option<String>,
  pub source_segment:  Option<String>,
  pub source_facet_id: Option<String>,
  pub evidence:        Option<String>,
  pub is_sensitive:    bool,
}

impl NewFact {
  /// Convenience constructor; sensitivity defaults from the category and
  /// type, provenance fields start empty.
  pub fn new(
    person_id: Uuid,
    category: FactCategory,
    fact_type: impl Into<String>,
    fact_value: impl Into<String>,
    confidence: f64,
  ) -> Self {
    let fact_type = fact_type.into();
    let is_sensitive = default_sensitivity(category, &fact_type);
    Self {
      person_id,
      category,
      fact_type,
      fact_value: fact_value.into(),
      confidence,
      source_type: "manual".to_owned(),
      source_channel: None,
      source_segment: None,
      source_facet_id: None,
      evidence: None,
      is_sensitive,
    }
  }
}

/// Whether [`crate::store::IdentityStore::insert_fact`] created a new row or
/// updated an existing one on the unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
  Inserted,
  Updated,
}

/// The result of a fact upsert: the stored row after conflict resolution.
#[derive(Debug, Clone)]
pub struct FactUpsert {
  pub fact:    PersonFact,
  pub outcome: UpsertOutcome,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hard_set_members() {
    assert!(is_hard_identifier("email_personal"));
    assert!(is_hard_identifier("ssn"));
    assert!(is_hard_identifier("full_legal_name"));
    assert!(!is_hard_identifier("employer_current"));
    assert!(!is_hard_identifier("favorite_color"));
  }

  #[test]
  fn strong_excludes_legal_name() {
    assert!(is_strong_identifier("social_discord"));
    assert!(!is_strong_identifier("full_legal_name"));
  }

  #[test]
  fn soft_weights() {
    assert_eq!(soft_weight("birthdate"), Some(0.25));
    assert_eq!(soft_weight("employer_current"), Some(0.20));
    assert_eq!(soft_weight("email_personal"), None);
  }

  #[test]
  fn identifier_covers_both_classes() {
    assert!(is_identifier("phone_mobile"));
    assert!(is_identifier("profession"));
    assert!(!is_identifier("hobby"));
  }

  #[test]
  fn category_roundtrip() {
    for c in [
      FactCategory::ContactInformation,
      FactCategory::OnlinePresence,
      FactCategory::Other,
    ] {
      assert_eq!(FactCategory::parse(c.as_str()).unwrap(), c);
    }
    assert!(FactCategory::parse("astrology").is_err());
  }
}
