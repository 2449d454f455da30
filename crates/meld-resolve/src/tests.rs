//! End-to-end resolution scenarios against an in-memory SQLite store.

use std::sync::Arc;

use meld_core::{
  contact::LinkSource,
  event::{Direction, NewEvent, ParticipantRole},
  fact::{FactCategory, NewFact},
  identifier::IdentifierKind,
  merge::{MergeStatus, MergeType, NewMergeEvent, TriggeringFact},
  person::NewPerson,
  store::IdentityStore,
  suggestion::{SuggestionEvidenceType, SuggestionStatus},
};
use meld_extract::{
  ConfidenceTier, ExtractedFact, ExtractionMetadata, SegmentExtraction,
  SubjectKind, UnattributedEntry,
};
use meld_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  ResolutionOptions, Resolver, engine, merge::MergeOutcome,
};

async fn resolver() -> Resolver<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  Resolver::new(Arc::new(store))
}

fn run_options(auto_merge: bool, include_soft: bool, tier1_only: bool)
-> ResolutionOptions {
  ResolutionOptions { auto_merge, include_soft, tier1_only }
}

async fn person(r: &Resolver<SqliteStore>, name: &str) -> Uuid {
  r.store()
    .create_person(NewPerson::named(name))
    .await
    .unwrap()
    .person_id
}

async fn seed_fact(
  r: &Resolver<SqliteStore>,
  person_id: Uuid,
  category: FactCategory,
  fact_type: &str,
  value: &str,
  confidence: f64,
) {
  r.store()
    .insert_fact(NewFact::new(person_id, category, fact_type, value, confidence))
    .await
    .unwrap();
}

/// Seed `n` events on a fresh contact linked to `person_id`.
async fn seed_events(r: &Resolver<SqliteStore>, person_id: Uuid, email: &str, n: usize) {
  let (contact, _) = r
    .store()
    .get_or_create_contact(IdentifierKind::Email, email, None, "mail")
    .await
    .unwrap();
  r.store()
    .ensure_person_contact_link(
      person_id,
      contact.contact_id,
      LinkSource::Deterministic,
      0.9,
    )
    .await
    .unwrap();

  for i in 0..n {
    let (event, _) = r
      .store()
      .insert_event(NewEvent {
        timestamp:      chrono::Utc::now(),
        channel:        "email".into(),
        content_types:  vec![],
        content:        "hello".into(),
        direction:      Direction::Received,
        thread_id:      None,
        source_adapter: "mail".into(),
        source_id:      format!("{email}-{i}"),
      })
      .await
      .unwrap();
    r.store()
      .add_event_participant(event.event_id, contact.contact_id, ParticipantRole::Sender)
      .await
      .unwrap();
  }
}

// ─── S1: hard-identifier collision auto-merge ────────────────────────────────

#[tokio::test]
async fn hard_collision_is_auto_merged() {
  let r = resolver().await;
  let p1 = person(&r, "Alice").await;
  let p2 = person(&r, "Alice W").await;

  for p in [p1, p2] {
    seed_fact(
      &r,
      p,
      FactCategory::ContactInformation,
      "email_personal",
      "alice@example.com",
      0.95,
    )
    .await;
  }

  let result = r
    .run_full_resolution(run_options(true, false, true))
    .await
    .unwrap();
  assert_eq!(result.hard_collisions, 1);
  assert_eq!(result.merge_suggestions_created, 1);
  assert_eq!(result.auto_merges_executed, 1);
  assert_eq!(result.errors, 0);

  // Orientation is deterministic: the lower id survives.
  let (target, source) = if p1 < p2 { (p1, p2) } else { (p2, p1) };

  let merged = r.store().get_person(source).await.unwrap().unwrap();
  assert_eq!(merged.merged_into, Some(target));
  let marker_tail =
    format!(" [MERGED→{}]", &target.hyphenated().to_string()[..8]);
  assert!(merged.canonical_name.ends_with(&marker_tail));

  // The colliding facts deduplicated to one row on the target.
  assert!(r.store().facts_for_person(source).await.unwrap().is_empty());
  let target_facts = r.store().facts_for_person(target).await.unwrap();
  assert_eq!(target_facts.len(), 1);
  assert_eq!(target_facts[0].fact_value, "alice@example.com");

  // The merge event is executed with the collision's average confidence.
  let merges = r.store().merge_pairs().await.unwrap();
  assert_eq!(merges.len(), 1);
  let pending = r.pending_merges().await.unwrap();
  assert!(pending.is_empty());

  let stats = r.resolution_stats().await.unwrap();
  assert_eq!(stats.active_persons, 1);
  assert_eq!(stats.merged_persons, 1);
}

#[tokio::test]
async fn executed_merge_event_records_evidence() {
  let r = resolver().await;
  let p1 = person(&r, "A").await;
  let p2 = person(&r, "B").await;

  for p in [p1, p2] {
    seed_fact(
      &r,
      p,
      FactCategory::ContactInformation,
      "email_personal",
      "x@example.com",
      0.95,
    )
    .await;
  }

  r.generate_merge_proposals(false, true).await.unwrap();
  let pending = r.pending_merges().await.unwrap();
  assert_eq!(pending.len(), 1);
  let merge = &pending[0].merge;
  assert_eq!(merge.merge_type, MergeType::HardIdentifier);
  assert!((merge.similarity_score - 0.95).abs() < 1e-9);
  assert!(merge.auto_eligible);
  assert_eq!(
    merge.triggering_facts,
    vec![TriggeringFact {
      fact_type:  "email_personal".into(),
      fact_value: "x@example.com".into(),
    }]
  );

  let (executed, errors) = r.execute_auto_merges().await.unwrap();
  assert_eq!((executed, errors), (1, 0));

  let stored = r
    .store()
    .get_merge_event(merge.merge_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.status, MergeStatus::Executed);
  assert_eq!(stored.resolved_by.as_deref(), Some("auto"));
  assert!(stored.resolved_at.is_some());
}

// ─── S2: conflict veto ───────────────────────────────────────────────────────

#[tokio::test]
async fn conflicting_birthdates_veto_the_merge() {
  let r = resolver().await;
  let p1 = person(&r, "A").await;
  let p2 = person(&r, "B").await;

  for p in [p1, p2] {
    seed_fact(
      &r,
      p,
      FactCategory::ContactInformation,
      "email_work",
      "shared@corp.example",
      0.9,
    )
    .await;
  }
  seed_fact(&r, p1, FactCategory::Personal, "birthdate", "1990-05-01", 0.9)
    .await;
  seed_fact(&r, p2, FactCategory::Personal, "birthdate", "1991-05-01", 0.9)
    .await;

  let result = r
    .run_full_resolution(run_options(true, false, true))
    .await
    .unwrap();
  assert_eq!(result.merge_suggestions_created, 1);
  assert_eq!(result.auto_merges_executed, 0);
  // A veto is a downgrade, not an error.
  assert_eq!(result.errors, 0);

  let pending = r.pending_merges().await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].merge.status, MergeStatus::Pending);
  assert!(!pending[0].merge.auto_eligible);

  // No facts moved on either side.
  assert_eq!(r.store().facts_for_person(p1).await.unwrap().len(), 2);
  assert_eq!(r.store().facts_for_person(p2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn equal_or_one_sided_veto_facts_do_not_block() {
  let r = resolver().await;
  let p1 = person(&r, "A").await;
  let p2 = person(&r, "B").await;

  for p in [p1, p2] {
    seed_fact(
      &r,
      p,
      FactCategory::ContactInformation,
      "email_personal",
      "same@example.com",
      0.9,
    )
    .await;
  }
  // Equal birthdates on both sides, passport on one side only.
  seed_fact(&r, p1, FactCategory::Personal, "birthdate", "1990-05-01", 0.9)
    .await;
  seed_fact(&r, p2, FactCategory::Personal, "birthdate", "1990-05-01", 0.9)
    .await;
  seed_fact(&r, p1, FactCategory::Legal, "passport_number", "X1234567", 0.9)
    .await;

  let result = r
    .run_full_resolution(run_options(true, false, true))
    .await
    .unwrap();
  assert_eq!(result.auto_merges_executed, 1);
}

// ─── S3: compound matches ────────────────────────────────────────────────────

#[tokio::test]
async fn shared_name_and_birthdate_propose_compound_merge() {
  let r = resolver().await;
  let p1 = person(&r, "Jane").await;
  let p2 = person(&r, "Jane Q").await;

  for p in [p1, p2] {
    seed_fact(
      &r,
      p,
      FactCategory::Personal,
      "full_legal_name",
      "Jane Q. Public",
      0.9,
    )
    .await;
    seed_fact(&r, p, FactCategory::Personal, "birthdate", "1988-11-20", 0.9)
      .await;
  }

  let result = r
    .run_full_resolution(run_options(false, false, false))
    .await
    .unwrap();
  assert_eq!(result.compound_matches, 1);
  assert_eq!(result.merge_suggestions_created, 1);

  let pending = r.pending_merges().await.unwrap();
  assert_eq!(pending.len(), 1);
  let merge = &pending[0].merge;
  assert_eq!(merge.merge_type, MergeType::Compound);
  assert!((merge.similarity_score - 0.90).abs() < 1e-9);
  assert!(merge.auto_eligible);
}

#[tokio::test]
async fn tier1_only_skips_compound_matching() {
  let r = resolver().await;
  let p1 = person(&r, "Jane").await;
  let p2 = person(&r, "Jane Q").await;

  for p in [p1, p2] {
    seed_fact(
      &r,
      p,
      FactCategory::Personal,
      "full_legal_name",
      "Jane Q. Public",
      0.9,
    )
    .await;
    seed_fact(&r, p, FactCategory::Personal, "birthdate", "1988-11-20", 0.9)
      .await;
  }

  let result = r
    .run_full_resolution(run_options(false, false, true))
    .await
    .unwrap();
  // A shared legal name alone is not Tier-1 evidence either.
  assert_eq!(result.merge_suggestions_created, 0);
  assert!(r.pending_merges().await.unwrap().is_empty());
}

// ─── S4: soft accumulation below threshold ───────────────────────────────────

#[tokio::test]
async fn soft_score_below_floor_proposes_nothing() {
  let r = resolver().await;
  let p1 = person(&r, "A").await;
  let p2 = person(&r, "B").await;

  // employer (0.20) + location (0.15) = 0.35 < 0.4 floor.
  for p in [p1, p2] {
    seed_fact(
      &r,
      p,
      FactCategory::Professional,
      "employer_current",
      "Acme",
      0.8,
    )
    .await;
    seed_fact(&r, p, FactCategory::Location, "location_current", "Berlin", 0.8)
      .await;
  }

  let result = r
    .run_full_resolution(run_options(false, true, false))
    .await
    .unwrap();
  assert_eq!(result.soft_accumulations, 0);
  assert_eq!(result.merge_suggestions_created, 0);
  assert!(r.pending_merges().await.unwrap().is_empty());
}

#[tokio::test]
async fn accumulated_soft_evidence_reaches_proposal_threshold() {
  let r = resolver().await;
  let p1 = person(&r, "A").await;
  let p2 = person(&r, "B").await;

  // spouse (0.25) + birthdate (0.25) + employer (0.20) = 0.70 ≥ 0.6.
  for p in [p1, p2] {
    seed_fact(&r, p, FactCategory::Relationship, "spouse_first_name", "Kim", 0.8)
      .await;
    seed_fact(&r, p, FactCategory::Personal, "birthdate", "1984-02-29", 0.8)
      .await;
    seed_fact(
      &r,
      p,
      FactCategory::Professional,
      "employer_current",
      "Acme",
      0.8,
    )
    .await;
  }

  let result = r
    .run_full_resolution(run_options(false, true, false))
    .await
    .unwrap();
  assert_eq!(result.soft_accumulations, 1);

  let pending = r.pending_merges().await.unwrap();
  // Birthdate also participates in no compound rule here (no shared name),
  // so the only proposal is the soft one.
  assert_eq!(pending.len(), 1);
  let merge = &pending[0].merge;
  assert_eq!(merge.merge_type, MergeType::SoftAccumulation);
  assert!((merge.similarity_score - 0.70).abs() < 1e-9);
  assert!(!merge.auto_eligible);
  assert_eq!(merge.triggering_facts.len(), 3);
}

// ─── S5: pair-explosion cap ──────────────────────────────────────────────────

#[tokio::test]
async fn oversized_collision_group_is_discarded() {
  let r = resolver().await;

  for i in 0..60 {
    let p = person(&r, &format!("Person {i}")).await;
    seed_fact(&r, p, FactCategory::Location, "location_current", "Austin", 0.8)
      .await;
  }

  let result = r
    .run_full_resolution(run_options(false, true, false))
    .await
    .unwrap();
  assert_eq!(result.soft_accumulations, 0);
  assert_eq!(result.merge_suggestions_created, 0);
  assert!(r.pending_merges().await.unwrap().is_empty());
}

// ─── S6: extraction ingestion of third parties ───────────────────────────────

fn third_party_fact(
  reference: &str,
  category: &str,
  fact_type: &str,
  value: &str,
) -> ExtractedFact {
  ExtractedFact {
    subject_kind:       SubjectKind::ThirdParty,
    subject_ref:        Some(reference.to_owned()),
    category:           category.to_owned(),
    fact_type:          fact_type.to_owned(),
    value:              value.to_owned(),
    confidence:         ConfidenceTier::Medium,
    evidence:           None,
    self_disclosed:     false,
    source:             None,
    related_person_ref: None,
    note:               None,
  }
}

fn segment(segment_id: &str, facts: Vec<ExtractedFact>) -> SegmentExtraction {
  SegmentExtraction {
    segment_id:          segment_id.to_owned(),
    extraction_metadata: ExtractionMetadata {
      channel:                    Some("imessage".into()),
      primary_contact_name:       None,
      primary_contact_identifier: None,
    },
    facts,
    unattributed_facts: vec![],
  }
}

#[tokio::test]
async fn third_party_with_strong_identifier_becomes_person() {
  let r = resolver().await;

  let doc = segment(
    "seg-1",
    vec![
      third_party_fact("Bob", "contact_information", "email_personal", "bob@x.com"),
      third_party_fact("Bob", "personal", "given_name", "Bob"),
      // Not an allowed third-party type; must not be attached.
      third_party_fact("Bob", "professional", "employer_current", "Initech"),
    ],
  );

  let stats = r.ingest_documents(&[doc]).await.unwrap();
  assert_eq!(stats.analysis_runs_processed, 1);
  assert_eq!(stats.third_parties_created, 1);
  assert_eq!(stats.facts_created, 2);
  assert_eq!(stats.errors, 0);

  let persons = r.store().list_persons(false).await.unwrap();
  let bob = persons
    .iter()
    .find(|p| p.canonical_name == "Bob")
    .expect("Bob promoted to a person");
  assert_eq!(bob.relationship_type.as_deref(), Some("third_party"));

  let facts = r.store().facts_for_person(bob.person_id).await.unwrap();
  let types: Vec<_> = facts.iter().map(|f| f.fact_type.as_str()).collect();
  assert!(types.contains(&"email_personal"));
  assert!(types.contains(&"given_name"));
  assert!(!types.contains(&"employer_current"));
  assert!(facts.iter().all(|f| f.source_segment.as_deref() == Some("seg-1")));
}

#[tokio::test]
async fn third_party_without_strong_identifier_becomes_mention() {
  let r = resolver().await;
  let before = r.store().list_persons(false).await.unwrap().len();

  let doc = segment(
    "seg-2",
    vec![
      third_party_fact("my sister Kate", "personal", "given_name", "Kate"),
      third_party_fact(
        "my sister Kate",
        "professional",
        "employer_current",
        "Initech",
      ),
    ],
  );

  let stats = r.ingest_documents(&[doc]).await.unwrap();
  assert_eq!(stats.third_parties_created, 0);
  assert_eq!(stats.facts_created, 0);

  assert_eq!(r.store().list_persons(false).await.unwrap().len(), before);

  let mentions = r.store().list_candidate_mentions().await.unwrap();
  assert_eq!(mentions.len(), 1);
  assert_eq!(mentions[0].reference, "my sister Kate");
  assert_eq!(mentions[0].source_segment_id, "seg-2");
  assert_eq!(
    mentions[0].known_facts.get("given_name").map(String::as_str),
    Some("Kate")
  );
  // Soft identifiers survive into the bundle for review.
  assert_eq!(
    mentions[0]
      .known_facts
      .get("employer_current")
      .map(String::as_str),
    Some("Initech")
  );
}

#[tokio::test]
async fn user_and_primary_contact_subjects_resolve() {
  let r = resolver().await;

  let me = r
    .store()
    .create_person(NewPerson {
      canonical_name: "Me".into(),
      display_name: None,
      is_me: true,
      relationship_type: None,
    })
    .await
    .unwrap();

  // Dana is reachable by her identifier.
  let (contact, _) = r
    .store()
    .get_or_create_contact(
      IdentifierKind::Phone,
      "+1 512 555 0100",
      Some("Dana Hu"),
      "imessage",
    )
    .await
    .unwrap();
  let (dana, _) = r
    .store()
    .ensure_person_for_contact(
      contact.contact_id,
      Some("Dana Hu"),
      LinkSource::Deterministic,
      0.9,
    )
    .await
    .unwrap();

  let mut doc = segment(
    "seg-3",
    vec![
      ExtractedFact {
        subject_kind: SubjectKind::User,
        subject_ref: None,
        category: "professional".into(),
        fact_type: "profession".into(),
        value: "engineer".into(),
        confidence: ConfidenceTier::High,
        evidence: None,
        self_disclosed: true,
        source: None,
        related_person_ref: None,
        note: None,
      },
      ExtractedFact {
        subject_kind: SubjectKind::PrimaryContact,
        subject_ref: Some("Dana".into()),
        category: "professional".into(),
        fact_type: "employer_current".into(),
        value: "Initech".into(),
        confidence: ConfidenceTier::High,
        evidence: None,
        self_disclosed: false,
        source: None,
        related_person_ref: None,
        note: None,
      },
    ],
  );
  doc.extraction_metadata.primary_contact_identifier =
    Some("+1 512 555 0100".into());
  doc.unattributed_facts.push(UnattributedEntry {
    fact_type:             "location_current".into(),
    fact_value:            "Berlin".into(),
    shared_by:             Some("Dana".into()),
    context:               Some("someone moved".into()),
    possible_attributions: vec!["Bob".into(), "Kate".into()],
    note:                  None,
  });

  let stats = r.ingest_documents(&[doc.clone()]).await.unwrap();
  assert_eq!(stats.facts_created, 2);
  assert_eq!(stats.unattributed_created, 1);

  let my_facts = r.store().facts_for_person(me.person_id).await.unwrap();
  assert_eq!(my_facts.len(), 1);
  assert_eq!(my_facts[0].fact_type, "profession");
  assert!((my_facts[0].confidence - 0.9).abs() < 1e-9);

  let dana_facts = r.store().facts_for_person(dana.person_id).await.unwrap();
  assert_eq!(dana_facts.len(), 1);
  assert_eq!(dana_facts[0].fact_value, "Initech");

  // Re-ingestion is idempotent for facts and unattributed rows.
  let stats = r.ingest_documents(&[doc]).await.unwrap();
  assert_eq!(stats.facts_created, 0);
  assert_eq!(stats.facts_updated, 2);
  assert_eq!(stats.unattributed_created, 0);
}

#[tokio::test]
async fn unknown_category_is_counted_and_skipped() {
  let r = resolver().await;
  let doc = segment(
    "seg-4",
    vec![third_party_fact("Bob", "astrology", "email_personal", "bob@x.com")],
  );

  let stats = r.ingest_documents(&[doc]).await.unwrap();
  assert_eq!(stats.errors, 1);
  assert_eq!(stats.third_parties_created, 0);
}

// ─── Merge-with-me protection ────────────────────────────────────────────────

#[tokio::test]
async fn the_user_is_never_a_merge_source() {
  let r = resolver().await;

  let me = r
    .store()
    .create_person(NewPerson {
      canonical_name: "Me".into(),
      display_name: None,
      is_me: true,
      relationship_type: None,
    })
    .await
    .unwrap();
  let other = person(&r, "Other").await;

  // Force a proposal with me on the wrong side.
  let merge = r
    .store()
    .insert_merge_event(NewMergeEvent {
      source_person_id: me.person_id,
      target_person_id: other,
      merge_type:       MergeType::Manual,
      triggering_facts: vec![],
      similarity_score: 1.0,
      auto_eligible:    false,
    })
    .await
    .unwrap()
    .unwrap();

  let err = r.execute_merge(merge.merge_id, "user").await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Domain(meld_core::Error::CannotMergeMe(_))
  ));

  // State unchanged.
  let me_after = r.store().get_person(me.person_id).await.unwrap().unwrap();
  assert!(me_after.merged_into.is_none());
  let stored = r.store().get_merge_event(merge.merge_id).await.unwrap().unwrap();
  assert_eq!(stored.status, MergeStatus::Pending);
}

#[tokio::test]
async fn proposals_orient_me_as_target() {
  let r = resolver().await;

  let me = r
    .store()
    .create_person(NewPerson {
      canonical_name: "Me".into(),
      display_name: None,
      is_me: true,
      relationship_type: None,
    })
    .await
    .unwrap();
  let other = person(&r, "Other").await;

  for p in [me.person_id, other] {
    seed_fact(
      &r,
      p,
      FactCategory::ContactInformation,
      "email_personal",
      "me@example.com",
      0.95,
    )
    .await;
  }

  let result = r
    .run_full_resolution(run_options(true, false, true))
    .await
    .unwrap();
  assert_eq!(result.auto_merges_executed, 1);

  let me_after = r.store().get_person(me.person_id).await.unwrap().unwrap();
  assert!(me_after.merged_into.is_none());
  let other_after = r.store().get_person(other).await.unwrap().unwrap();
  assert_eq!(other_after.merged_into, Some(me.person_id));
}

// ─── Suggestion surface ──────────────────────────────────────────────────────

#[tokio::test]
async fn similar_names_with_history_are_suggested_and_acceptable() {
  let r = resolver().await;
  let p1 = person(&r, "Dana Hu").await;
  let p2 = person(&r, "Dana Hu Jr.").await;
  let quiet = person(&r, "Dana Hu Sr.").await;

  seed_events(&r, p1, "dana@one.example", 5).await;
  seed_events(&r, p2, "dana@two.example", 6).await;
  // Below the event-count floor; never suggested.
  seed_events(&r, quiet, "dana@three.example", 2).await;

  let created = r.generate_suggestions().await.unwrap();
  assert_eq!(created, 1);

  // Re-running suppresses the still-pending pair.
  assert_eq!(r.generate_suggestions().await.unwrap(), 0);

  let pending = r
    .store()
    .list_suggestions(Some(SuggestionStatus::Pending))
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  let suggestion = &pending[0];
  assert_eq!(suggestion.evidence_type, SuggestionEvidenceType::NameSimilarity);
  assert!((suggestion.confidence - 0.8).abs() < 1e-9);

  let accepted = r.accept_suggestion(suggestion.suggestion_id).await.unwrap();
  let source = r
    .store()
    .get_person(accepted.person2_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(source.merged_into, Some(accepted.person1_id));

  let stored = r
    .store()
    .get_suggestion(suggestion.suggestion_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.status, SuggestionStatus::Accepted);
}

#[tokio::test]
async fn shared_private_domain_is_suggested_public_is_not() {
  let r = resolver().await;
  let p1 = person(&r, "Pat Lee").await;
  let p2 = person(&r, "P. Lee").await;
  let p3 = person(&r, "Sam Moss").await;

  seed_events(&r, p1, "pat@initech.example", 1).await;
  seed_events(&r, p2, "plee@initech.example", 1).await;
  seed_events(&r, p3, "sam@gmail.com", 1).await;
  seed_fact(
    &r,
    p3,
    FactCategory::ContactInformation,
    "email_personal",
    "sam.alt@gmail.com",
    0.9,
  )
  .await;

  let created = r.generate_suggestions().await.unwrap();
  assert_eq!(created, 1);

  let pending = r
    .store()
    .list_suggestions(Some(SuggestionStatus::Pending))
    .await
    .unwrap();
  assert_eq!(pending[0].evidence_type, SuggestionEvidenceType::SharedDomain);
  assert!((pending[0].confidence - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn suggestions_for_merged_persons_expire() {
  let r = resolver().await;
  let p1 = person(&r, "Dana Hu").await;
  let p2 = person(&r, "Dana Hu Jr.").await;

  seed_events(&r, p1, "dana@one.example", 5).await;
  seed_events(&r, p2, "dana@two.example", 5).await;

  assert_eq!(r.generate_suggestions().await.unwrap(), 1);

  // p2 is consumed by an unrelated person-level merge.
  r.store().merge_persons(p2, p1).await.unwrap();

  assert_eq!(r.cleanup_expired_suggestions().await.unwrap(), 1);
  let expired = r
    .store()
    .list_suggestions(Some(SuggestionStatus::Expired))
    .await
    .unwrap();
  assert_eq!(expired.len(), 1);
}

// ─── Phase ordering ──────────────────────────────────────────────────────────

#[tokio::test]
async fn earlier_phases_suppress_later_proposals_for_the_same_pair() {
  let r = resolver().await;
  let p1 = person(&r, "A").await;
  let p2 = person(&r, "B").await;

  // Hard collision AND a compound-qualifying overlap on the same pair.
  for p in [p1, p2] {
    seed_fact(
      &r,
      p,
      FactCategory::ContactInformation,
      "email_personal",
      "x@example.com",
      0.95,
    )
    .await;
    seed_fact(
      &r,
      p,
      FactCategory::Personal,
      "full_legal_name",
      "Jane Q. Public",
      0.9,
    )
    .await;
    seed_fact(&r, p, FactCategory::Personal, "birthdate", "1988-11-20", 0.9)
      .await;
  }

  let outcome = r.generate_merge_proposals(true, false).await.unwrap();
  assert_eq!(outcome.created, 1);

  let pending = r.pending_merges().await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].merge.merge_type, MergeType::HardIdentifier);
}

#[tokio::test]
async fn vetoed_merge_outcome_is_reported() {
  let r = resolver().await;
  let p1 = person(&r, "A").await;
  let p2 = person(&r, "B").await;

  for p in [p1, p2] {
    seed_fact(
      &r,
      p,
      FactCategory::ContactInformation,
      "email_personal",
      "x@example.com",
      0.95,
    )
    .await;
  }
  seed_fact(&r, p1, FactCategory::Legal, "ssn", "123-45-6789", 0.9).await;
  seed_fact(&r, p2, FactCategory::Legal, "ssn", "987-65-4321", 0.9).await;

  r.generate_merge_proposals(false, true).await.unwrap();
  let pending = r.pending_merges().await.unwrap();
  let outcome = r
    .execute_merge(pending[0].merge.merge_id, "user")
    .await
    .unwrap();
  assert_eq!(outcome, MergeOutcome::Vetoed);
}

// ─── Options plumbing ────────────────────────────────────────────────────────

#[tokio::test]
async fn include_soft_false_skips_phase_three() {
  let r = resolver().await;
  let p1 = person(&r, "A").await;
  let p2 = person(&r, "B").await;

  for p in [p1, p2] {
    seed_fact(&r, p, FactCategory::Relationship, "spouse_first_name", "Kim", 0.8)
      .await;
    seed_fact(&r, p, FactCategory::Personal, "birthdate", "1984-02-29", 0.8)
      .await;
    seed_fact(
      &r,
      p,
      FactCategory::Professional,
      "employer_current",
      "Acme",
      0.8,
    )
    .await;
  }

  let result = r
    .run_full_resolution(engine::ResolutionOptions {
      auto_merge:   false,
      include_soft: false,
      tier1_only:   false,
    })
    .await
    .unwrap();
  assert_eq!(result.soft_accumulations, 0);
  assert_eq!(result.merge_suggestions_created, 0);
}
