//! Contacts — the minimal participatory unit attached to events.
//!
//! A contact is a single communication endpoint. It never represents "the
//! same human across channels" by itself; that is what persons and
//! person-contact links are for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifier::IdentifierKind;

/// A communication endpoint first seen on some channel. Contacts are created
/// on first sight of an identifier and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id:   Uuid,
  pub display_name: Option<String>,
  /// Which importer or subsystem created this contact.
  pub source:       String,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

/// A channel-scoped identifier owned by a contact.
/// Unique store-wide by (kind, normalized).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactIdentifier {
  pub contact_id: Uuid,
  pub kind:       IdentifierKind,
  /// The identifier as originally observed.
  pub value:      String,
  /// The canonical matching form (see [`crate::identifier::normalize`]).
  pub normalized: String,
}

// ─── Person-contact links ────────────────────────────────────────────────────

/// How a person-contact link came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkSource {
  /// Derived mechanically from an identifier match.
  Deterministic,
  /// Asserted by the user.
  Manual,
  /// Rewritten during merge execution.
  Merge,
  /// Carried over from a schema or data migration.
  Migration,
  /// Created while ingesting analyzer output.
  Extraction,
}

impl LinkSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Deterministic => "deterministic",
      Self::Manual => "manual",
      Self::Merge => "merge",
      Self::Migration => "migration",
      Self::Extraction => "extraction",
    }
  }
}

/// A many-to-many link between a person and a contact. One contact usually
/// resolves to one person; one person may hold many contacts (cross-channel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonContactLink {
  pub person_id:  Uuid,
  pub contact_id: Uuid,
  pub source:     LinkSource,
  pub confidence: f64,
}
