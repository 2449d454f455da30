//! Facts that could not be attributed to a single person, and named third
//! parties held for review instead of being promoted to persons.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fact heard in conversation but not attributable to one person.
/// Unique by (fact_type, fact_value, source_segment_id); duplicates are
/// silently skipped on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnattributedFact {
  pub id:                    Uuid,
  pub fact_type:             String,
  pub fact_value:            String,
  /// The person who shared the fact, when the reference resolved.
  pub shared_by_person_id:   Option<Uuid>,
  pub source_segment_id:     String,
  pub context:               String,
  /// The analyzer's candidate attributions, preserved verbatim.
  pub possible_attributions: Vec<String>,
  pub created_at:            DateTime<Utc>,
}

/// Input to [`crate::store::IdentityStore::insert_unattributed`].
#[derive(Debug, Clone)]
pub struct NewUnattributedFact {
  pub fact_type:             String,
  pub fact_value:            String,
  pub shared_by_person_id:   Option<Uuid>,
  pub source_segment_id:     String,
  pub context:               String,
  pub possible_attributions: Vec<String>,
}

// ─── Candidate mentions ──────────────────────────────────────────────────────

/// A named third party mentioned in conversation lacking any strong
/// identifier — held for human review, not promoted to a person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMention {
  pub id:                Uuid,
  /// The reference string as it appeared, e.g. `"my sister Kate"`.
  pub reference:         String,
  /// The cleaned fact bundle: fact_type → value. Limited to
  /// identifier-class types and name variants.
  pub known_facts:       BTreeMap<String, String>,
  pub source_segment_id: String,
  pub created_at:        DateTime<Utc>,
}

/// Input to [`crate::store::IdentityStore::insert_candidate_mention`].
#[derive(Debug, Clone)]
pub struct NewCandidateMention {
  pub reference:         String,
  pub known_facts:       BTreeMap<String, String>,
  pub source_segment_id: String,
}
