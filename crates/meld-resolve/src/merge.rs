//! Merge proposal and execution.
//!
//! Proposals run in three strictly-ordered phases (hard identifier,
//! compound, soft accumulation); the "existing pairs" cache is threaded
//! through so later phases observe earlier-phase proposals without a
//! per-pair lookup. Execution carries the conflict veto and the
//! merge-with-me rule.

use std::collections::{BTreeMap, HashSet};

use meld_core::{
  Error as DomainError,
  collision::CompoundMatch,
  fact::CONFLICT_VETO_TYPES,
  merge::{MergeStatus, MergeType, NewMergeEvent, PersonPair, TriggeringFact},
  store::IdentityStore,
};
use uuid::Uuid;

use crate::{Error, Resolver, Result};

/// What one proposal pass did, per phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProposalOutcome {
  /// Hard-identifier collision groups considered (after the cap).
  pub hard_collisions:    usize,
  /// Compound pairs considered.
  pub compound_matches:   usize,
  /// Soft pairs at or above the candidate floor.
  pub soft_accumulations: usize,
  /// Merge events actually written.
  pub created:            usize,
  pub errors:             usize,
}

/// What happened to one merge when execution was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
  Executed,
  /// A hard contradiction was found; the merge was downgraded to manual
  /// review and nothing moved.
  Vetoed,
}

impl<S: IdentityStore> Resolver<S> {
  /// Phase 1 → 2 → 3 proposal generation. Existing pairs (any status)
  /// suppress duplicates; at most one merge event ever exists per
  /// unordered pair.
  pub async fn generate_merge_proposals(
    &self,
    include_soft: bool,
    tier1_only:   bool,
  ) -> Result<ProposalOutcome> {
    let mut outcome = ProposalOutcome::default();

    // One pass over merge_events, not a per-pair lookup.
    let mut existing: HashSet<PersonPair> = self
      .store
      .merge_pairs()
      .await
      .map_err(Error::store)?
      .into_iter()
      .collect();

    let me = self
      .store
      .me_person()
      .await
      .map_err(Error::store)?
      .map(|p| p.person_id);

    // ── Phase 1: hard identifier collisions ───────────────────────────────
    // A shared legal name alone is never Tier-1 merge evidence; names
    // participate through the compound rules instead.
    let collisions: Vec<_> = self
      .hard_collisions()
      .await?
      .into_iter()
      .filter(|c| meld_core::fact::is_strong_identifier(&c.fact_type))
      .collect();
    outcome.hard_collisions = collisions.len();

    for collision in &collisions {
      let auto = collision.avg_confidence >= self.config.auto_merge_threshold;
      for (a, b) in collision.pairs() {
        let proposal = NewMergeEvent {
          source_person_id: Uuid::nil(), // oriented below
          target_person_id: Uuid::nil(),
          merge_type:       MergeType::HardIdentifier,
          triggering_facts: vec![TriggeringFact {
            fact_type:  collision.fact_type.clone(),
            fact_value: collision.fact_value.clone(),
          }],
          similarity_score: collision.avg_confidence,
          auto_eligible:    auto,
        };
        self
          .propose_pair(a, b, me, proposal, &mut existing, &mut outcome)
          .await?;
      }
    }

    if tier1_only {
      return Ok(outcome);
    }

    // ── Phase 2: compound matches ─────────────────────────────────────────
    let mut compound: Vec<CompoundMatch> = Vec::new();
    compound.extend(
      self
        .store
        .name_birthdate_matches()
        .await
        .map_err(Error::store)?,
    );
    compound.extend(
      self
        .store
        .name_employer_location_matches()
        .await
        .map_err(Error::store)?,
    );
    // The two rules can hit the same pair; the stronger rule wins.
    let mut by_pair: BTreeMap<(Uuid, Uuid), CompoundMatch> = BTreeMap::new();
    for m in compound {
      let key = (m.person_a, m.person_b);
      match by_pair.get(&key) {
        Some(prev) if prev.rule.confidence() >= m.rule.confidence() => {}
        _ => {
          by_pair.insert(key, m);
        }
      }
    }
    outcome.compound_matches = by_pair.len();

    for m in by_pair.into_values() {
      let proposal = NewMergeEvent {
        source_person_id: Uuid::nil(),
        target_person_id: Uuid::nil(),
        merge_type:       MergeType::Compound,
        triggering_facts: m.shared.clone(),
        similarity_score: m.rule.confidence(),
        auto_eligible:    true,
      };
      self
        .propose_pair(
          m.person_a, m.person_b, me, proposal, &mut existing, &mut outcome,
        )
        .await?;
    }

    if !include_soft {
      return Ok(outcome);
    }

    // ── Phase 3: soft accumulation ────────────────────────────────────────
    let soft = self.soft_matches().await?;
    outcome.soft_accumulations = soft.len();

    for m in soft {
      if m.score < self.config.soft_merge_threshold {
        continue;
      }
      let proposal = NewMergeEvent {
        source_person_id: Uuid::nil(),
        target_person_id: Uuid::nil(),
        merge_type:       MergeType::SoftAccumulation,
        triggering_facts: m.evidence.clone(),
        // Accumulated weights can exceed 1; the stored score does not.
        similarity_score: m.score.min(1.0),
        auto_eligible:    false,
      };
      self
        .propose_pair(
          m.person_a, m.person_b, me, proposal, &mut existing, &mut outcome,
        )
        .await?;
    }

    Ok(outcome)
  }

  /// Orient a pair (the is-me person is always the target, otherwise the
  /// lower id survives) and write the proposal unless the pair is known.
  async fn propose_pair(
    &self,
    a:        Uuid,
    b:        Uuid,
    me:       Option<Uuid>,
    proposal: NewMergeEvent,
    existing: &mut HashSet<PersonPair>,
    outcome:  &mut ProposalOutcome,
  ) -> Result<()> {
    if a == b {
      return Ok(());
    }
    let pair = PersonPair::new(a, b);
    if existing.contains(&pair) {
      return Ok(());
    }

    let (source, target) = match me {
      Some(me) if me == pair.lo() => (pair.hi(), pair.lo()),
      Some(me) if me == pair.hi() => (pair.lo(), pair.hi()),
      _ => (pair.hi(), pair.lo()),
    };

    let proposal = NewMergeEvent {
      source_person_id: source,
      target_person_id: target,
      ..proposal
    };

    match self.store.insert_merge_event(proposal).await {
      Ok(Some(merge)) => {
        existing.insert(pair);
        outcome.created += 1;
        tracing::debug!(
          merge_id = %merge.merge_id,
          merge_type = merge.merge_type.as_str(),
          score = merge.similarity_score,
          auto_eligible = merge.auto_eligible,
          "proposed merge"
        );
      }
      // Lost a race with a concurrent proposer; the pair constraint held.
      Ok(None) => {
        existing.insert(pair);
      }
      Err(e) => {
        tracing::warn!(error = %e, "failed to write merge proposal");
        outcome.errors += 1;
      }
    }
    Ok(())
  }

  // ── Execution ───────────────────────────────────────────────────────────

  /// Sweep all pending auto-eligible merges. Per-item failures are logged
  /// and counted, never fatal to the sweep. Returns (executed, errors).
  pub async fn execute_auto_merges(&self) -> Result<(usize, usize)> {
    let pending = self
      .store
      .pending_auto_merges()
      .await
      .map_err(Error::store)?;

    let mut executed = 0;
    let mut errors = 0;
    for merge in pending {
      match self.execute_merge(merge.merge_id, "auto").await {
        Ok(MergeOutcome::Executed) => executed += 1,
        Ok(MergeOutcome::Vetoed) => {
          tracing::info!(
            merge_id = %merge.merge_id,
            "merge vetoed by conflicting facts; held for manual review"
          );
        }
        Err(e) => {
          tracing::warn!(
            merge_id = %merge.merge_id,
            error = %e,
            "auto-merge failed"
          );
          errors += 1;
        }
      }
    }

    tracing::info!(executed, errors, "auto-merge sweep completed");
    Ok((executed, errors))
  }

  /// Execute one pending merge: veto check, is-me rule, then the store's
  /// all-or-nothing transaction.
  pub async fn execute_merge(
    &self,
    merge_id:    Uuid,
    resolved_by: &str,
  ) -> Result<MergeOutcome> {
    let merge = self
      .store
      .get_merge_event(merge_id)
      .await
      .map_err(Error::store)?
      .ok_or(DomainError::MergeNotFound(merge_id))?;

    if merge.status != MergeStatus::Pending {
      return Err(DomainError::MergeAlreadyResolved(merge_id).into());
    }

    // The is-me person may never be consumed.
    if let Some(me) = self.store.me_person().await.map_err(Error::store)?
      && me.person_id == merge.source_person_id
    {
      return Err(DomainError::CannotMergeMe(me.person_id).into());
    }

    if let Some(conflict) = self
      .merge_conflict(merge.source_person_id, merge.target_person_id)
      .await?
    {
      tracing::info!(
        merge_id = %merge_id,
        fact_type = %conflict,
        "conflicting fact values; downgrading merge to manual"
      );
      self
        .store
        .downgrade_merge(merge_id)
        .await
        .map_err(Error::store)?;
      return Ok(MergeOutcome::Vetoed);
    }

    self
      .store
      .execute_merge(merge_id, resolved_by)
      .await
      .map_err(Error::store)?;

    tracing::info!(
      merge_id = %merge_id,
      source = %merge.source_person_id,
      target = %merge.target_person_id,
      resolved_by,
      "merge executed"
    );
    Ok(MergeOutcome::Executed)
  }

  /// Accept a pending merge on behalf of a human reviewer.
  pub async fn accept_merge(&self, merge_id: Uuid) -> Result<MergeOutcome> {
    self.execute_merge(merge_id, "user").await
  }

  /// Reject a pending merge without touching persons.
  pub async fn reject_merge(&self, merge_id: Uuid) -> Result<()> {
    self
      .store
      .reject_merge(merge_id, "user")
      .await
      .map_err(Error::store)
  }

  /// The conflict veto: a fact type whose values differ on both sides with
  /// no overlap is a hard contradiction. Equal values, or a value missing
  /// on one side, are not. Returns the first contradicting type.
  async fn merge_conflict(
    &self,
    source: Uuid,
    target: Uuid,
  ) -> Result<Option<String>> {
    let source_facts = self
      .store
      .facts_for_person(source)
      .await
      .map_err(Error::store)?;
    let target_facts = self
      .store
      .facts_for_person(target)
      .await
      .map_err(Error::store)?;

    for veto_type in CONFLICT_VETO_TYPES {
      let source_values: HashSet<&str> = source_facts
        .iter()
        .filter(|f| f.fact_type == *veto_type)
        .map(|f| f.fact_value.as_str())
        .collect();
      let target_values: HashSet<&str> = target_facts
        .iter()
        .filter(|f| f.fact_type == *veto_type)
        .map(|f| f.fact_value.as_str())
        .collect();

      if !source_values.is_empty()
        && !target_values.is_empty()
        && source_values.is_disjoint(&target_values)
      {
        return Ok(Some((*veto_type).to_owned()));
      }
    }
    Ok(None)
  }
}
