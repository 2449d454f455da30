//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as integer Unix seconds. Structured fields
//! (content types, triggering facts, evidence, known facts) are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings — their
//! string order matches their byte order, which is what makes the
//! (pair_lo, pair_hi) unique key work.

use chrono::{DateTime, Utc};
use meld_core::{
  contact::Contact,
  event::{Direction, Event},
  fact::{FactCategory, PersonFact},
  identifier::IdentifierKind,
  mention::CandidateMention,
  merge::{MergeEvent, MergeStatus, MergeType, TriggeringFact},
  person::Person,
  suggestion::{
    MergeSuggestion, SuggestionEvidenceType, SuggestionStatus,
  },
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_uuid_opt(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_ts(dt: DateTime<Utc>) -> i64 { dt.timestamp() }

pub fn decode_ts(secs: i64) -> Result<DateTime<Utc>> {
  DateTime::<Utc>::from_timestamp(secs, 0)
    .ok_or_else(|| Error::Decode(format!("timestamp out of range: {secs}")))
}

// ─── Enum discriminants ──────────────────────────────────────────────────────

pub fn decode_identifier_kind(s: &str) -> Result<IdentifierKind> {
  match s {
    "email" => Ok(IdentifierKind::Email),
    "phone" => Ok(IdentifierKind::Phone),
    "handle" => Ok(IdentifierKind::Handle),
    other => Err(Error::Decode(format!("unknown identifier kind: {other:?}"))),
  }
}

pub fn decode_direction(s: &str) -> Result<Direction> {
  match s {
    "sent" => Ok(Direction::Sent),
    "received" => Ok(Direction::Received),
    "observed" => Ok(Direction::Observed),
    other => Err(Error::Decode(format!("unknown direction: {other:?}"))),
  }
}

pub fn decode_merge_type(s: &str) -> Result<MergeType> {
  match s {
    "hard_identifier" => Ok(MergeType::HardIdentifier),
    "compound" => Ok(MergeType::Compound),
    "soft_accumulation" => Ok(MergeType::SoftAccumulation),
    "manual" => Ok(MergeType::Manual),
    other => Err(Error::Decode(format!("unknown merge type: {other:?}"))),
  }
}

pub fn decode_merge_status(s: &str) -> Result<MergeStatus> {
  match s {
    "pending" => Ok(MergeStatus::Pending),
    "accepted" => Ok(MergeStatus::Accepted),
    "rejected" => Ok(MergeStatus::Rejected),
    "executed" => Ok(MergeStatus::Executed),
    other => Err(Error::Decode(format!("unknown merge status: {other:?}"))),
  }
}

pub fn decode_evidence_type(s: &str) -> Result<SuggestionEvidenceType> {
  match s {
    "name_similarity" => Ok(SuggestionEvidenceType::NameSimilarity),
    "shared_domain" => Ok(SuggestionEvidenceType::SharedDomain),
    "co_occurrence" => Ok(SuggestionEvidenceType::CoOccurrence),
    other => Err(Error::Decode(format!("unknown evidence type: {other:?}"))),
  }
}

pub fn decode_suggestion_status(s: &str) -> Result<SuggestionStatus> {
  match s {
    "pending" => Ok(SuggestionStatus::Pending),
    "accepted" => Ok(SuggestionStatus::Accepted),
    "rejected" => Ok(SuggestionStatus::Rejected),
    "expired" => Ok(SuggestionStatus::Expired),
    other => {
      Err(Error::Decode(format!("unknown suggestion status: {other:?}")))
    }
  }
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_string_vec(v: &[String]) -> Result<String> {
  Ok(serde_json::to_string(v)?)
}

pub fn decode_string_vec(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_triggering_facts(v: &[TriggeringFact]) -> Result<String> {
  Ok(serde_json::to_string(v)?)
}

pub fn decode_triggering_facts(s: &str) -> Result<Vec<TriggeringFact>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns read from a `persons` row.
pub struct RawPerson {
  pub person_id:         String,
  pub canonical_name:    String,
  pub display_name:      Option<String>,
  pub is_me:             bool,
  pub relationship_type: Option<String>,
  pub merged_into:       Option<String>,
  pub created_at:        i64,
  pub updated_at:        i64,
}

/// Column list matching [`person_from_row`]; keep the two in sync.
pub const PERSON_COLS: &str = "person_id, canonical_name, display_name, \
                               is_me, relationship_type, merged_into, \
                               created_at, updated_at";

pub fn person_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawPerson> {
  Ok(RawPerson {
    person_id:         row.get(0)?,
    canonical_name:    row.get(1)?,
    display_name:      row.get(2)?,
    is_me:             row.get(3)?,
    relationship_type: row.get(4)?,
    merged_into:       row.get(5)?,
    created_at:        row.get(6)?,
    updated_at:        row.get(7)?,
  })
}

impl RawPerson {
  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      person_id:         decode_uuid(&self.person_id)?,
      canonical_name:    self.canonical_name,
      display_name:      self.display_name,
      is_me:             self.is_me,
      relationship_type: self.relationship_type,
      merged_into:       decode_uuid_opt(self.merged_into.as_deref())?,
      created_at:        decode_ts(self.created_at)?,
      updated_at:        decode_ts(self.updated_at)?,
    })
  }
}

/// Raw columns read from a `contacts` row.
pub struct RawContact {
  pub contact_id:   String,
  pub display_name: Option<String>,
  pub source:       String,
  pub created_at:   i64,
  pub updated_at:   i64,
}

pub const CONTACT_COLS: &str =
  "contact_id, display_name, source, created_at, updated_at";

pub fn contact_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawContact> {
  Ok(RawContact {
    contact_id:   row.get(0)?,
    display_name: row.get(1)?,
    source:       row.get(2)?,
    created_at:   row.get(3)?,
    updated_at:   row.get(4)?,
  })
}

impl RawContact {
  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      contact_id:   decode_uuid(&self.contact_id)?,
      display_name: self.display_name,
      source:       self.source,
      created_at:   decode_ts(self.created_at)?,
      updated_at:   decode_ts(self.updated_at)?,
    })
  }
}

/// Raw columns read from an `events` row.
pub struct RawEvent {
  pub event_id:       String,
  pub timestamp:      i64,
  pub channel:        String,
  pub content_types:  String,
  pub content:        String,
  pub direction:      String,
  pub thread_id:      Option<String>,
  pub source_adapter: String,
  pub source_id:      String,
}

pub const EVENT_COLS: &str = "event_id, timestamp, channel, content_types, \
                              content, direction, thread_id, source_adapter, \
                              source_id";

pub fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawEvent> {
  Ok(RawEvent {
    event_id:       row.get(0)?,
    timestamp:      row.get(1)?,
    channel:        row.get(2)?,
    content_types:  row.get(3)?,
    content:        row.get(4)?,
    direction:      row.get(5)?,
    thread_id:      row.get(6)?,
    source_adapter: row.get(7)?,
    source_id:      row.get(8)?,
  })
}

impl RawEvent {
  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:       decode_uuid(&self.event_id)?,
      timestamp:      decode_ts(self.timestamp)?,
      channel:        self.channel,
      content_types:  decode_string_vec(&self.content_types)?,
      content:        self.content,
      direction:      decode_direction(&self.direction)?,
      thread_id:      self.thread_id,
      source_adapter: self.source_adapter,
      source_id:      self.source_id,
    })
  }
}

/// Raw columns read from a `person_facts` row.
pub struct RawFact {
  pub fact_id:            String,
  pub person_id:          String,
  pub category:           String,
  pub fact_type:          String,
  pub fact_value:         String,
  pub confidence:         f64,
  pub source_type:        String,
  pub source_channel:     Option<String>,
  pub source_segment:     Option<String>,
  pub source_facet_id:    Option<String>,
  pub evidence:           Option<String>,
  pub is_sensitive:       bool,
  pub is_identifier:      bool,
  pub is_hard_identifier: bool,
  pub created_at:         i64,
  pub updated_at:         i64,
}

pub const FACT_COLS: &str =
  "fact_id, person_id, category, fact_type, fact_value, confidence, \
   source_type, source_channel, source_segment, source_facet_id, evidence, \
   is_sensitive, is_identifier, is_hard_identifier, created_at, updated_at";

pub fn fact_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawFact> {
  Ok(RawFact {
    fact_id:            row.get(0)?,
    person_id:          row.get(1)?,
    category:           row.get(2)?,
    fact_type:          row.get(3)?,
    fact_value:         row.get(4)?,
    confidence:         row.get(5)?,
    source_type:        row.get(6)?,
    source_channel:     row.get(7)?,
    source_segment:     row.get(8)?,
    source_facet_id:    row.get(9)?,
    evidence:           row.get(10)?,
    is_sensitive:       row.get(11)?,
    is_identifier:      row.get(12)?,
    is_hard_identifier: row.get(13)?,
    created_at:         row.get(14)?,
    updated_at:         row.get(15)?,
  })
}

impl RawFact {
  pub fn into_fact(self) -> Result<PersonFact> {
    Ok(PersonFact {
      fact_id:            decode_uuid(&self.fact_id)?,
      person_id:          decode_uuid(&self.person_id)?,
      category:           FactCategory::parse(&self.category)
        .map_err(|_| Error::Decode(format!(
          "unknown category in store: {:?}", self.category
        )))?,
      fact_type:          self.fact_type,
      fact_value:         self.fact_value,
      confidence:         self.confidence,
      source_type:        self.source_type,
      source_channel:     self.source_channel,
      source_segment:     self.source_segment,
      source_facet_id:    self.source_facet_id,
      evidence:           self.evidence,
      is_sensitive:       self.is_sensitive,
      is_identifier:      self.is_identifier,
      is_hard_identifier: self.is_hard_identifier,
      created_at:         decode_ts(self.created_at)?,
      updated_at:         decode_ts(self.updated_at)?,
    })
  }
}

/// Raw columns read from a `merge_events` row.
pub struct RawMergeEvent {
  pub merge_id:         String,
  pub source_person_id: String,
  pub target_person_id: String,
  pub merge_type:       String,
  pub triggering_facts: String,
  pub similarity_score: f64,
  pub status:           String,
  pub auto_eligible:    bool,
  pub created_at:       i64,
  pub resolved_at:      Option<i64>,
  pub resolved_by:      Option<String>,
}

pub const MERGE_COLS: &str =
  "merge_id, source_person_id, target_person_id, merge_type, \
   triggering_facts, similarity_score, status, auto_eligible, created_at, \
   resolved_at, resolved_by";

pub fn merge_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawMergeEvent> {
  Ok(RawMergeEvent {
    merge_id:         row.get(0)?,
    source_person_id: row.get(1)?,
    target_person_id: row.get(2)?,
    merge_type:       row.get(3)?,
    triggering_facts: row.get(4)?,
    similarity_score: row.get(5)?,
    status:           row.get(6)?,
    auto_eligible:    row.get(7)?,
    created_at:       row.get(8)?,
    resolved_at:      row.get(9)?,
    resolved_by:      row.get(10)?,
  })
}

impl RawMergeEvent {
  pub fn into_merge_event(self) -> Result<MergeEvent> {
    Ok(MergeEvent {
      merge_id:         decode_uuid(&self.merge_id)?,
      source_person_id: decode_uuid(&self.source_person_id)?,
      target_person_id: decode_uuid(&self.target_person_id)?,
      merge_type:       decode_merge_type(&self.merge_type)?,
      triggering_facts: decode_triggering_facts(&self.triggering_facts)?,
      similarity_score: self.similarity_score,
      status:           decode_merge_status(&self.status)?,
      auto_eligible:    self.auto_eligible,
      created_at:       decode_ts(self.created_at)?,
      resolved_at:      self.resolved_at.map(decode_ts).transpose()?,
      resolved_by:      self.resolved_by,
    })
  }
}

/// Raw columns read from a `merge_suggestions` row.
pub struct RawSuggestion {
  pub suggestion_id:       String,
  pub person1_id:          String,
  pub person2_id:          String,
  pub evidence_type:       String,
  pub evidence:            String,
  pub confidence:          f64,
  pub person1_event_count: i64,
  pub person2_event_count: i64,
  pub status:              String,
  pub created_at:          i64,
  pub reviewed_at:         Option<i64>,
}

pub const SUGGESTION_COLS: &str =
  "suggestion_id, person1_id, person2_id, evidence_type, evidence, \
   confidence, person1_event_count, person2_event_count, status, \
   created_at, reviewed_at";

pub fn suggestion_from_row(
  row: &rusqlite::Row,
) -> rusqlite::Result<RawSuggestion> {
  Ok(RawSuggestion {
    suggestion_id:       row.get(0)?,
    person1_id:          row.get(1)?,
    person2_id:          row.get(2)?,
    evidence_type:       row.get(3)?,
    evidence:            row.get(4)?,
    confidence:          row.get(5)?,
    person1_event_count: row.get(6)?,
    person2_event_count: row.get(7)?,
    status:              row.get(8)?,
    created_at:          row.get(9)?,
    reviewed_at:         row.get(10)?,
  })
}

impl RawSuggestion {
  pub fn into_suggestion(self) -> Result<MergeSuggestion> {
    Ok(MergeSuggestion {
      suggestion_id:       decode_uuid(&self.suggestion_id)?,
      person1_id:          decode_uuid(&self.person1_id)?,
      person2_id:          decode_uuid(&self.person2_id)?,
      evidence_type:       decode_evidence_type(&self.evidence_type)?,
      evidence:            serde_json::from_str(&self.evidence)?,
      confidence:          self.confidence,
      person1_event_count: self.person1_event_count,
      person2_event_count: self.person2_event_count,
      status:              decode_suggestion_status(&self.status)?,
      created_at:          decode_ts(self.created_at)?,
      reviewed_at:         self.reviewed_at.map(decode_ts).transpose()?,
    })
  }
}

/// Raw columns read from a `candidate_mentions` row.
pub struct RawMention {
  pub id:                String,
  pub reference:         String,
  pub known_facts:       String,
  pub source_segment_id: String,
  pub created_at:        i64,
}

pub fn mention_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawMention> {
  Ok(RawMention {
    id:                row.get(0)?,
    reference:         row.get(1)?,
    known_facts:       row.get(2)?,
    source_segment_id: row.get(3)?,
    created_at:        row.get(4)?,
  })
}

impl RawMention {
  pub fn into_mention(self) -> Result<CandidateMention> {
    Ok(CandidateMention {
      id:                decode_uuid(&self.id)?,
      reference:         self.reference,
      known_facts:       serde_json::from_str(&self.known_facts)?,
      source_segment_id: self.source_segment_id,
      created_at:        decode_ts(self.created_at)?,
    })
  }
}
