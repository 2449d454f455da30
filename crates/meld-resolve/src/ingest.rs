//! Extraction ingestion: turning analyzer output into person facts,
//! candidate mentions, and unattributed facts.
//!
//! Subject resolution order per fact:
//! 1. `user` → the is-me person, or drop.
//! 2. `primary_contact` → identifier lookup, then name match over segment
//!    participants, then the only non-me participant, or drop.
//! 3. `third_party` → bucketed by normalized reference; promoted to a new
//!    person only when the bundle carries a strong identifier, otherwise
//!    held as a candidate mention.
//! 4. `other`/blank → participant name match, else the third-party bucket.

use std::collections::BTreeMap;

use meld_core::{
  fact::{self, FactCategory, NewFact, UpsertOutcome},
  identifier::IdentifierKind,
  mention::{NewCandidateMention, NewUnattributedFact},
  person::{NewPerson, Person},
  report::SyncStats,
  store::IdentityStore,
};
use meld_extract::{
  ExtractedFact, SegmentExtraction, SubjectKind, parse_documents,
};
use uuid::Uuid;

use crate::{Error, Resolver, Result};

/// Fact types a third-party reference may carry: strong identifiers plus
/// name variants. Everything else about a barely-known person is noise.
const THIRD_PARTY_NAME_TYPES: &[&str] =
  &["full_legal_name", "given_name", "family_name", "nickname"];

fn third_party_fact_allowed(fact_type: &str) -> bool {
  fact::is_strong_identifier(fact_type)
    || THIRD_PARTY_NAME_TYPES.contains(&fact_type)
}

fn mention_fact_allowed(fact_type: &str) -> bool {
  fact::is_identifier(fact_type) || THIRD_PARTY_NAME_TYPES.contains(&fact_type)
}

/// A per-segment bundle of facts collected under one third-party reference.
struct ThirdPartyBundle {
  /// The reference as it first appeared, for the canonical name.
  reference: String,
  facts:     Vec<(FactCategory, ExtractedFact)>,
}

impl<S: IdentityStore> Resolver<S> {
  /// Parse and ingest one analyzer run (a single document or an array).
  pub async fn ingest_json(&self, input: &str) -> Result<SyncStats> {
    let documents = parse_documents(input)?;
    self.ingest_documents(&documents).await
  }

  /// Ingest parsed analyzer documents. Safe to re-run: fact upserts
  /// deduplicate and unattributed inserts are conflict-skipped. Per-segment
  /// failures are counted and the batch continues.
  pub async fn ingest_documents(
    &self,
    documents: &[SegmentExtraction],
  ) -> Result<SyncStats> {
    let mut stats = SyncStats::default();

    for document in documents {
      match self.ingest_segment(document, &mut stats).await {
        Ok(()) => stats.analysis_runs_processed += 1,
        Err(e) => {
          tracing::warn!(
            segment_id = %document.segment_id,
            error = %e,
            "failed to ingest segment extraction"
          );
          stats.errors += 1;
        }
      }
    }

    tracing::info!(
      runs = stats.analysis_runs_processed,
      facts_created = stats.facts_created,
      facts_updated = stats.facts_updated,
      third_parties = stats.third_parties_created,
      unattributed = stats.unattributed_created,
      errors = stats.errors,
      "extraction ingestion completed"
    );
    Ok(stats)
  }

  async fn ingest_segment(
    &self,
    document: &SegmentExtraction,
    stats:    &mut SyncStats,
  ) -> Result<()> {
    let me = self.store.me_person().await.map_err(Error::store)?;
    let participants = self
      .store
      .segment_participants(&document.segment_id)
      .await
      .map_err(Error::store)?;
    let primary = self
      .resolve_primary_contact(document, &participants, me.as_ref())
      .await?;

    let mut buckets: BTreeMap<String, ThirdPartyBundle> = BTreeMap::new();

    for extracted in &document.facts {
      stats.facets_processed += 1;

      let category = match FactCategory::parse(&extracted.category) {
        Ok(c) => c,
        Err(e) => {
          tracing::debug!(
            segment_id = %document.segment_id,
            error = %e,
            "skipping fact with unknown category"
          );
          stats.errors += 1;
          continue;
        }
      };
      if extracted.fact_type.trim().is_empty()
        || extracted.value.trim().is_empty()
      {
        stats.errors += 1;
        continue;
      }

      let subject = match extracted.subject_kind {
        SubjectKind::User => me.as_ref().map(|p| p.person_id),
        SubjectKind::PrimaryContact => primary.as_ref().map(|p| p.person_id),
        SubjectKind::ThirdParty => {
          bucket_fact(&mut buckets, extracted, category);
          continue;
        }
        SubjectKind::Other => {
          let named = extracted
            .subject_ref
            .as_deref()
            .and_then(|name| match_participant(name, &participants));
          match named {
            Some(p) => Some(p.person_id),
            None if extracted.subject_ref.is_some() => {
              bucket_fact(&mut buckets, extracted, category);
              continue;
            }
            None => None,
          }
        }
      };

      // No resolvable subject: dropping is by design, not an error.
      let Some(person_id) = subject else {
        tracing::debug!(
          segment_id = %document.segment_id,
          fact_type = %extracted.fact_type,
          "dropping fact with unresolvable subject"
        );
        continue;
      };

      self
        .write_extracted_fact(person_id, category, extracted, document, stats)
        .await;
    }

    for bundle in buckets.into_values() {
      self
        .settle_third_party(bundle, document, stats)
        .await?;
    }

    for entry in &document.unattributed_facts {
      let shared_by = match entry.shared_by.as_deref() {
        Some(name) => self
          .store
          .find_persons_by_name(name)
          .await
          .map_err(Error::store)?
          .into_iter()
          .next()
          .map(|p| p.person_id),
        None => None,
      };

      let created = self
        .store
        .insert_unattributed(NewUnattributedFact {
          fact_type:             entry.fact_type.clone(),
          fact_value:            entry.fact_value.clone(),
          shared_by_person_id:   shared_by,
          source_segment_id:     document.segment_id.clone(),
          context:               entry.context.clone().unwrap_or_default(),
          possible_attributions: entry.possible_attributions.clone(),
        })
        .await
        .map_err(Error::store)?;
      if created {
        stats.unattributed_created += 1;
      }
    }

    Ok(())
  }

  async fn write_extracted_fact(
    &self,
    person_id: Uuid,
    category:  FactCategory,
    extracted: &ExtractedFact,
    document:  &SegmentExtraction,
    stats:     &mut SyncStats,
  ) {
    let mut input = NewFact::new(
      person_id,
      category,
      extracted.fact_type.clone(),
      extracted.value.trim(),
      extracted.confidence.score(),
    );
    input.source_type = "extraction".to_owned();
    input.source_channel = document.extraction_metadata.channel.clone();
    input.source_segment = Some(document.segment_id.clone());
    input.evidence = extracted.evidence.clone();

    match self.store.insert_fact(input).await {
      Ok(upsert) => match upsert.outcome {
        UpsertOutcome::Inserted => stats.facts_created += 1,
        UpsertOutcome::Updated => stats.facts_updated += 1,
      },
      Err(e) => {
        tracing::warn!(
          person_id = %person_id,
          fact_type = %extracted.fact_type,
          error = %e,
          "failed to store extracted fact"
        );
        stats.errors += 1;
      }
    }
  }

  /// Promote a third-party bundle to a person when it carries a strong
  /// identifier; otherwise hold it as a candidate mention.
  async fn settle_third_party(
    &self,
    bundle:   ThirdPartyBundle,
    document: &SegmentExtraction,
    stats:    &mut SyncStats,
  ) -> Result<()> {
    let has_strong = bundle
      .facts
      .iter()
      .any(|(_, f)| fact::is_strong_identifier(&f.fact_type));

    if !has_strong {
      let known_facts: BTreeMap<String, String> = bundle
        .facts
        .iter()
        .filter(|(_, f)| mention_fact_allowed(&f.fact_type))
        .map(|(_, f)| (f.fact_type.clone(), f.value.trim().to_owned()))
        .collect();

      self
        .store
        .insert_candidate_mention(NewCandidateMention {
          reference: bundle.reference,
          known_facts,
          source_segment_id: document.segment_id.clone(),
        })
        .await
        .map_err(Error::store)?;
      return Ok(());
    }

    let person = self
      .store
      .create_person(NewPerson {
        canonical_name:    bundle.reference.clone(),
        display_name:      None,
        is_me:             false,
        relationship_type: Some("third_party".to_owned()),
      })
      .await
      .map_err(Error::store)?;
    stats.third_parties_created += 1;

    tracing::info!(
      person_id = %person.person_id,
      reference = %bundle.reference,
      segment_id = %document.segment_id,
      "created third-party person from extraction"
    );

    for (category, extracted) in &bundle.facts {
      if !third_party_fact_allowed(&extracted.fact_type) {
        continue;
      }
      self
        .write_extracted_fact(
          person.person_id,
          *category,
          extracted,
          document,
          stats,
        )
        .await;
    }

    Ok(())
  }

  /// Resolve the segment's primary contact: identifier lookup first, then
  /// a name match over participants, then the only non-me participant.
  async fn resolve_primary_contact(
    &self,
    document:     &SegmentExtraction,
    participants: &[Person],
    me:           Option<&Person>,
  ) -> Result<Option<Person>> {
    let metadata = &document.extraction_metadata;

    if let Some(identifier) = metadata
      .primary_contact_identifier
      .as_deref()
      .filter(|s| !s.trim().is_empty())
    {
      let kind = guess_identifier_kind(identifier);
      if let Ok(Some(contact)) = self.store.find_contact(kind, identifier).await
      {
        let linked = self
          .store
          .persons_for_contact(contact.contact_id)
          .await
          .map_err(Error::store)?;
        if let Some(person) = linked.into_iter().find(|p| !p.is_me) {
          return Ok(Some(person));
        }
      }
    }

    // The primary contact is by definition not the user; name-match only
    // the non-me participants.
    let me_id = me.map(|p| p.person_id);
    let non_me_participants: Vec<Person> = participants
      .iter()
      .filter(|p| Some(p.person_id) != me_id)
      .cloned()
      .collect();

    if let Some(name) = metadata
      .primary_contact_name
      .as_deref()
      .filter(|s| !s.trim().is_empty())
      && let Some(person) = match_participant(name, &non_me_participants)
    {
      return Ok(Some(person.clone()));
    }

    // Last resort: a two-party conversation has exactly one non-me side.
    let mut non_me = non_me_participants.iter();
    if let (Some(only), None) = (non_me.next(), non_me.next()) {
      return Ok(Some(only.clone()));
    }

    Ok(None)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn bucket_fact(
  buckets:   &mut BTreeMap<String, ThirdPartyBundle>,
  extracted: &ExtractedFact,
  category:  FactCategory,
) {
  let Some(reference) = extracted
    .subject_ref
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
  else {
    return;
  };

  let bundle = buckets
    .entry(reference.to_lowercase())
    .or_insert_with(|| ThirdPartyBundle {
      reference: reference.to_owned(),
      facts:     Vec::new(),
    });
  bundle.facts.push((category, extracted.clone()));
}

/// Case-insensitive containment match between a reference and participant
/// canonical/display names, in either direction.
fn match_participant<'p>(
  name:         &str,
  participants: &'p [Person],
) -> Option<&'p Person> {
  let needle = name.trim().to_lowercase();
  if needle.is_empty() {
    return None;
  }

  participants.iter().find(|p| {
    let canonical = p.canonical_name.to_lowercase();
    if canonical.contains(&needle) || needle.contains(&canonical) {
      return true;
    }
    p.display_name.as_deref().is_some_and(|d| {
      let display = d.to_lowercase();
      display.contains(&needle) || needle.contains(&display)
    })
  })
}

/// Best-effort classification of a raw primary-contact identifier.
fn guess_identifier_kind(raw: &str) -> IdentifierKind {
  let trimmed = raw.trim();
  if trimmed.contains('@') && !trimmed.starts_with('@') {
    return IdentifierKind::Email;
  }
  let digits = trimmed.chars().filter(char::is_ascii_digit).count();
  if digits >= 7 && digits * 2 >= trimmed.len() {
    return IdentifierKind::Phone;
  }
  IdentifierKind::Handle
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identifier_kind_guessing() {
    assert_eq!(
      guess_identifier_kind("dana@example.com"),
      IdentifierKind::Email
    );
    assert_eq!(
      guess_identifier_kind("+1 (512) 555-0100"),
      IdentifierKind::Phone
    );
    assert_eq!(guess_identifier_kind("@dana_hu"), IdentifierKind::Handle);
    assert_eq!(guess_identifier_kind("dana_hu"), IdentifierKind::Handle);
  }

  #[test]
  fn third_party_allowance() {
    assert!(third_party_fact_allowed("email_personal"));
    assert!(third_party_fact_allowed("nickname"));
    assert!(third_party_fact_allowed("full_legal_name"));
    assert!(!third_party_fact_allowed("employer_current"));

    assert!(mention_fact_allowed("employer_current"));
    assert!(!mention_fact_allowed("favorite_color"));
  }
}
