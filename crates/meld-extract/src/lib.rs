//! Typed model and parser for the analyzer's per-segment JSON output.
//!
//! The analyzer runs outside this system; we consume its output only. One
//! run produces either a single document or an array of documents, one per
//! conversation segment. This crate turns that JSON into typed values and
//! nothing more — subject resolution and storage live in `meld-resolve`.

pub mod error;
mod parse;

pub use error::{Error, Result};
pub use parse::parse_documents;

use serde::Deserialize;

// ─── Subjects ────────────────────────────────────────────────────────────────

/// Who a fact is about, as claimed by the analyzer. Unknown strings and
/// missing values collapse to [`SubjectKind::Other`], whose handling falls
/// back to participant matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SubjectKind {
  User,
  PrimaryContact,
  ThirdParty,
  #[default]
  Other,
}

impl From<String> for SubjectKind {
  fn from(s: String) -> Self {
    match s.as_str() {
      "user" => Self::User,
      "primary_contact" => Self::PrimaryContact,
      "third_party" => Self::ThirdParty,
      _ => Self::Other,
    }
  }
}

// ─── Confidence ──────────────────────────────────────────────────────────────

/// The analyzer's coarse confidence tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ConfidenceTier {
  High,
  Medium,
  Low,
  /// Anything unrecognised; scored conservatively.
  #[default]
  Unspecified,
}

impl From<String> for ConfidenceTier {
  fn from(s: String) -> Self {
    match s.as_str() {
      "high" => Self::High,
      "medium" => Self::Medium,
      "low" => Self::Low,
      _ => Self::Unspecified,
    }
  }
}

impl ConfidenceTier {
  /// Numeric mapping: high = 0.9, medium = 0.7, low = 0.4, else 0.5.
  pub fn score(&self) -> f64 {
    match self {
      Self::High => 0.9,
      Self::Medium => 0.7,
      Self::Low => 0.4,
      Self::Unspecified => 0.5,
    }
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Context the analyzer recorded about the segment it analysed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionMetadata {
  #[serde(default)]
  pub channel:                    Option<String>,
  #[serde(default)]
  pub primary_contact_name:       Option<String>,
  #[serde(default)]
  pub primary_contact_identifier: Option<String>,
}

/// One extracted fact claim.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedFact {
  #[serde(default)]
  pub subject_kind:       SubjectKind,
  #[serde(default)]
  pub subject_ref:        Option<String>,
  pub category:           String,
  pub fact_type:          String,
  pub value:              String,
  #[serde(default)]
  pub confidence:         ConfidenceTier,
  #[serde(default)]
  pub evidence:           Option<String>,
  #[serde(default)]
  pub self_disclosed:     bool,
  #[serde(default)]
  pub source:             Option<String>,
  #[serde(default)]
  pub related_person_ref: Option<String>,
  #[serde(default)]
  pub note:               Option<String>,
}

/// A fact the analyzer heard but could not pin on one person.
#[derive(Debug, Clone, Deserialize)]
pub struct UnattributedEntry {
  pub fact_type:             String,
  pub fact_value:            String,
  #[serde(default)]
  pub shared_by:             Option<String>,
  #[serde(default)]
  pub context:               Option<String>,
  #[serde(default)]
  pub possible_attributions: Vec<String>,
  #[serde(default)]
  pub note:                  Option<String>,
}

/// One analyzer document: the output for a single conversation segment.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentExtraction {
  pub segment_id:          String,
  #[serde(default)]
  pub extraction_metadata: ExtractionMetadata,
  #[serde(default)]
  pub facts:               Vec<ExtractedFact>,
  #[serde(default)]
  pub unattributed_facts:  Vec<UnattributedEntry>,
}
