//! Collision orchestration and the soft-identifier scorer.
//!
//! Collision detection itself is a store query (a grouped scan, O(F log F)
//! in the number of facts). This module applies the pair-explosion cap and
//! accumulates soft-identifier weights into pairwise scores — it never
//! enumerates person pairs outside a capped collision group.

use std::collections::HashMap;

use meld_core::{
  collision::{FactCollision, SoftMatch},
  fact::SOFT_IDENTIFIER_WEIGHTS,
  merge::{PersonPair, TriggeringFact},
  store::IdentityStore,
};

use crate::{Error, Resolver, Result};

impl<S: IdentityStore> Resolver<S> {
  /// Hard-identifier collisions with oversized groups discarded.
  pub async fn hard_collisions(&self) -> Result<Vec<FactCollision>> {
    let collisions = self
      .store
      .hard_identifier_collisions()
      .await
      .map_err(Error::store)?;
    Ok(self.discard_oversized(collisions))
  }

  /// Collisions for one fact type, same cap applied.
  pub async fn collisions_of_type(
    &self,
    fact_type: &str,
  ) -> Result<Vec<FactCollision>> {
    let collisions = self
      .store
      .fact_collisions(fact_type)
      .await
      .map_err(Error::store)?;
    Ok(self.discard_oversized(collisions))
  }

  fn discard_oversized(
    &self,
    collisions: Vec<FactCollision>,
  ) -> Vec<FactCollision> {
    collisions
      .into_iter()
      .filter(|c| {
        let keep = c.person_ids.len() <= self.config.max_group_size;
        if !keep {
          tracing::debug!(
            fact_type = %c.fact_type,
            fact_value = %c.fact_value,
            group_size = c.person_ids.len(),
            "discarding oversized collision group"
          );
        }
        keep
      })
      .collect()
  }

  /// Accumulate soft-identifier evidence into pairwise scores.
  ///
  /// For every soft type, each (capped) collision adds the type's weight to
  /// every unordered pair in the group. Pairs at or above the candidate
  /// floor are returned in descending score order.
  pub async fn soft_matches(&self) -> Result<Vec<SoftMatch>> {
    let mut scores: HashMap<PersonPair, (f64, Vec<TriggeringFact>)> =
      HashMap::new();

    for (fact_type, weight) in SOFT_IDENTIFIER_WEIGHTS {
      let collisions = self.collisions_of_type(fact_type).await?;
      for collision in &collisions {
        for (a, b) in collision.pairs() {
          let entry = scores
            .entry(PersonPair::new(a, b))
            .or_insert_with(|| (0.0, Vec::new()));
          entry.0 += weight;
          entry.1.push(TriggeringFact {
            fact_type:  collision.fact_type.clone(),
            fact_value: collision.fact_value.clone(),
          });
        }
      }
    }

    let mut matches: Vec<SoftMatch> = scores
      .into_iter()
      .filter(|(_, (score, _))| *score >= self.config.soft_score_floor)
      .map(|(pair, (score, evidence))| SoftMatch {
        person_a: pair.lo(),
        person_b: pair.hi(),
        score,
        evidence,
      })
      .collect();

    matches.sort_by(|a, b| {
      b.score
        .partial_cmp(&a.score)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| (a.person_a, a.person_b).cmp(&(b.person_a, b.person_b)))
    });
    Ok(matches)
  }
}
