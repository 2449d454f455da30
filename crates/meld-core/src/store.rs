//! The `IdentityStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `meld-store-sqlite`).
//! Higher layers (`meld-resolve`, `meld-api`) depend on this abstraction,
//! not on any concrete backend.
//!
//! Write-heavy operations (merge execution, extraction ingestion) should be
//! serialised by the caller; readers may run concurrently with the single
//! writer. Cancellation is by dropping the returned future — a transaction
//! that never commits rolls back.

use uuid::Uuid;

use crate::{
  collision::{CompoundMatch, FactCollision},
  contact::{Contact, ContactIdentifier, LinkSource},
  event::{Event, NewEvent, ParticipantRole},
  fact::{FactCategory, FactUpsert, NewFact, PersonFact},
  identifier::IdentifierKind,
  mention::{CandidateMention, NewCandidateMention, NewUnattributedFact},
  merge::{MergeEvent, NewMergeEvent, PendingMerge, PersonPair},
  person::{NewPerson, Person},
  report::ResolutionStats,
  suggestion::{MergeSuggestion, NewSuggestion, SuggestionStatus},
};

/// Abstraction over a Meld identity store backend.
///
/// All mutations that touch more than one row across more than one table run
/// inside a single transaction in the backend; merge execution in particular
/// is strictly all-or-nothing.
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Events (importer surface; the engine only reads) ──────────────────

  /// Insert an event, deduplicated by (source_adapter, source_id).
  /// Returns the stored event and whether it was newly created.
  async fn insert_event(
    &self,
    input: NewEvent,
  ) -> Result<(Event, bool), Self::Error>;

  /// Record a contact's participation in an event. Idempotent.
  async fn add_event_participant(
    &self,
    event_id:   Uuid,
    contact_id: Uuid,
    role:       ParticipantRole,
  ) -> Result<(), Self::Error>;

  /// Assign an event to a conversation segment (written by the external
  /// chunker). Idempotent.
  async fn assign_event_segment(
    &self,
    segment_id: &str,
    event_id:   Uuid,
  ) -> Result<(), Self::Error>;

  // ── Contact registry ──────────────────────────────────────────────────

  /// Look up a contact by (kind, normalized identifier), creating it — with
  /// one attached identifier row — if absent. Returns the contact and
  /// whether it was newly created.
  async fn get_or_create_contact(
    &self,
    kind:         IdentifierKind,
    identifier:   &str,
    display_name: Option<&str>,
    source:       &str,
  ) -> Result<(Contact, bool), Self::Error>;

  /// Find the contact owning (kind, normalize(identifier)), if any.
  async fn find_contact(
    &self,
    kind:       IdentifierKind,
    identifier: &str,
  ) -> Result<Option<Contact>, Self::Error>;

  async fn contact_identifiers(
    &self,
    contact_id: Uuid,
  ) -> Result<Vec<ContactIdentifier>, Self::Error>;

  /// Idempotent upsert of a person-contact link.
  async fn ensure_person_contact_link(
    &self,
    person_id:  Uuid,
    contact_id: Uuid,
    source:     LinkSource,
    confidence: f64,
  ) -> Result<(), Self::Error>;

  /// If the contact already resolves to exactly one person, reuse it;
  /// otherwise create a new person (canonical name = `display_name` or a
  /// placeholder) and link it. Returns the person and whether it was
  /// newly created.
  async fn ensure_person_for_contact(
    &self,
    contact_id:   Uuid,
    display_name: Option<&str>,
    source:       LinkSource,
    confidence:   f64,
  ) -> Result<(Person, bool), Self::Error>;

  /// All persons linked to a contact, in link-creation order.
  async fn persons_for_contact(
    &self,
    contact_id: Uuid,
  ) -> Result<Vec<Person>, Self::Error>;

  // ── Persons ───────────────────────────────────────────────────────────

  async fn create_person(
    &self,
    input: NewPerson,
  ) -> Result<Person, Self::Error>;

  async fn get_person(
    &self,
    person_id: Uuid,
  ) -> Result<Option<Person>, Self::Error>;

  /// The single person with `is_me = true`, if one exists.
  async fn me_person(&self) -> Result<Option<Person>, Self::Error>;

  /// Case-insensitive substring match over canonical and display names,
  /// excluding merged-away persons.
  async fn find_persons_by_name(
    &self,
    fragment: &str,
  ) -> Result<Vec<Person>, Self::Error>;

  async fn list_persons(
    &self,
    include_merged: bool,
  ) -> Result<Vec<Person>, Self::Error>;

  /// Distinct persons participating (through their linked contacts) in a
  /// segment's events.
  async fn segment_participants(
    &self,
    segment_id: &str,
  ) -> Result<Vec<Person>, Self::Error>;

  /// Every unmerged person together with its distinct-event count.
  async fn persons_with_event_counts(
    &self,
  ) -> Result<Vec<(Person, i64)>, Self::Error>;

  /// All email addresses attached to a person: contact identifiers of kind
  /// email plus stored `email_*` facts.
  async fn person_emails(
    &self,
    person_id: Uuid,
  ) -> Result<Vec<String>, Self::Error>;

  // ── Facts ─────────────────────────────────────────────────────────────

  /// Insert or upsert on the unique key (person, category, type, value):
  /// confidence takes the max, optional provenance fields coalesce in,
  /// `updated_at` refreshes.
  async fn insert_fact(
    &self,
    input: NewFact,
  ) -> Result<FactUpsert, Self::Error>;

  async fn facts_for_person(
    &self,
    person_id: Uuid,
  ) -> Result<Vec<PersonFact>, Self::Error>;

  async fn facts_for_person_in_category(
    &self,
    person_id: Uuid,
    category:  FactCategory,
  ) -> Result<Vec<PersonFact>, Self::Error>;

  async fn facts_of_type(
    &self,
    fact_type: &str,
  ) -> Result<Vec<PersonFact>, Self::Error>;

  async fn hard_identifier_facts(&self) -> Result<Vec<PersonFact>, Self::Error>;

  // ── Collision detection ───────────────────────────────────────────────

  /// Groups of ≥ 2 distinct persons sharing a value of `fact_type`.
  async fn fact_collisions(
    &self,
    fact_type: &str,
  ) -> Result<Vec<FactCollision>, Self::Error>;

  /// The same, over the full hard-identifier subset.
  async fn hard_identifier_collisions(
    &self,
  ) -> Result<Vec<FactCollision>, Self::Error>;

  /// Pairs sharing an exact `full_legal_name` and `birthdate`.
  async fn name_birthdate_matches(
    &self,
  ) -> Result<Vec<CompoundMatch>, Self::Error>;

  /// Pairs sharing a name (`full_legal_name` or `given_name`), an
  /// `employer_current`, and a `location_current`.
  async fn name_employer_location_matches(
    &self,
  ) -> Result<Vec<CompoundMatch>, Self::Error>;

  // ── Merge events ──────────────────────────────────────────────────────

  /// Insert a pending merge event. Returns `None` when a merge event for
  /// the unordered pair already exists.
  async fn insert_merge_event(
    &self,
    input: NewMergeEvent,
  ) -> Result<Option<MergeEvent>, Self::Error>;

  async fn get_merge_event(
    &self,
    merge_id: Uuid,
  ) -> Result<Option<MergeEvent>, Self::Error>;

  /// All unordered pairs that already have a merge event, regardless of
  /// status — used to suppress duplicate proposals in one pass.
  async fn merge_pairs(&self) -> Result<Vec<PersonPair>, Self::Error>;

  /// Pending merges with both canonical names resolved, for review.
  async fn pending_merges(&self) -> Result<Vec<PendingMerge>, Self::Error>;

  async fn pending_auto_merges(&self) -> Result<Vec<MergeEvent>, Self::Error>;

  /// Strip auto-eligibility from a conflicted merge, leaving it pending
  /// for manual review.
  async fn downgrade_merge(&self, merge_id: Uuid) -> Result<(), Self::Error>;

  /// Mark a pending merge rejected.
  async fn reject_merge(
    &self,
    merge_id:    Uuid,
    resolved_by: &str,
  ) -> Result<(), Self::Error>;

  /// Execute a merge in a single transaction: relocate facts (target rows
  /// win on the unique key), rewrite links, mark the source person merged
  /// (both `merged_into` and the canonical-name marker), and stamp the
  /// merge event executed. Callers perform the conflict veto and is-me
  /// checks first.
  async fn execute_merge(
    &self,
    merge_id:    Uuid,
    resolved_by: &str,
  ) -> Result<(), Self::Error>;

  /// Person-level merge without a merge event — the suggestion-accept
  /// path. Same relocation semantics as [`Self::execute_merge`].
  async fn merge_persons(
    &self,
    source: Uuid,
    target: Uuid,
  ) -> Result<(), Self::Error>;

  // ── Unattributed facts & candidate mentions ───────────────────────────

  /// Insert an unattributed fact; returns `false` when an identical
  /// (type, value, segment) row already existed.
  async fn insert_unattributed(
    &self,
    input: NewUnattributedFact,
  ) -> Result<bool, Self::Error>;

  async fn insert_candidate_mention(
    &self,
    input: NewCandidateMention,
  ) -> Result<CandidateMention, Self::Error>;

  async fn list_candidate_mentions(
    &self,
  ) -> Result<Vec<CandidateMention>, Self::Error>;

  // ── Suggestions ───────────────────────────────────────────────────────

  async fn insert_suggestion(
    &self,
    input: NewSuggestion,
  ) -> Result<MergeSuggestion, Self::Error>;

  async fn get_suggestion(
    &self,
    suggestion_id: Uuid,
  ) -> Result<Option<MergeSuggestion>, Self::Error>;

  async fn list_suggestions(
    &self,
    status: Option<SuggestionStatus>,
  ) -> Result<Vec<MergeSuggestion>, Self::Error>;

  /// Unordered pairs with a pending suggestion — suppresses duplicates.
  async fn pending_suggestion_pairs(
    &self,
  ) -> Result<Vec<PersonPair>, Self::Error>;

  /// Set a suggestion's status and stamp `reviewed_at`.
  async fn set_suggestion_status(
    &self,
    suggestion_id: Uuid,
    status:        SuggestionStatus,
  ) -> Result<(), Self::Error>;

  // ── Stats ─────────────────────────────────────────────────────────────

  async fn resolution_stats(&self) -> Result<ResolutionStats, Self::Error>;
}
