//! [`Resolver`] — the entry point tying detection, merging, ingestion, and
//! suggestions together over one store.

use std::sync::Arc;

use meld_core::{
  merge::PendingMerge,
  report::{ResolutionResult, ResolutionStats},
  store::IdentityStore,
};

use crate::{Error, ResolverConfig, Result};

/// Options for [`Resolver::run_full_resolution`].
#[derive(Debug, Clone, Copy)]
pub struct ResolutionOptions {
  /// Execute auto-eligible merges at the end of the run.
  pub auto_merge:   bool,
  /// Run Phase 3 (soft accumulation).
  pub include_soft: bool,
  /// Stop after Phase 1 (hard identifier collisions).
  pub tier1_only:   bool,
}

impl Default for ResolutionOptions {
  fn default() -> Self {
    Self { auto_merge: false, include_soft: true, tier1_only: false }
  }
}

/// The resolution engine. Cheap to clone; state lives in the store.
pub struct Resolver<S> {
  pub(crate) store:  Arc<S>,
  pub(crate) config: ResolverConfig,
}

impl<S> Clone for Resolver<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: self.config.clone() }
  }
}

impl<S: IdentityStore> Resolver<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self::with_config(store, ResolverConfig::default())
  }

  pub fn with_config(store: Arc<S>, config: ResolverConfig) -> Self {
    Self { store, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &ResolverConfig { &self.config }

  /// One batch resolution pass: propose merges across the requested tiers,
  /// then (optionally) execute everything auto-eligible.
  pub async fn run_full_resolution(
    &self,
    options: ResolutionOptions,
  ) -> Result<ResolutionResult> {
    tracing::info!(
      auto_merge = options.auto_merge,
      include_soft = options.include_soft,
      tier1_only = options.tier1_only,
      "starting resolution pass"
    );

    let proposals = self
      .generate_merge_proposals(options.include_soft, options.tier1_only)
      .await?;

    let mut result = ResolutionResult {
      hard_collisions:           proposals.hard_collisions,
      compound_matches:          proposals.compound_matches,
      soft_accumulations:        proposals.soft_accumulations,
      merge_suggestions_created: proposals.created,
      auto_merges_executed:      0,
      errors:                    proposals.errors,
    };

    if options.auto_merge {
      let (executed, errors) = self.execute_auto_merges().await?;
      result.auto_merges_executed = executed;
      result.errors += errors;
    }

    tracing::info!(
      hard_collisions = result.hard_collisions,
      compound_matches = result.compound_matches,
      soft_accumulations = result.soft_accumulations,
      proposals_created = result.merge_suggestions_created,
      auto_merges_executed = result.auto_merges_executed,
      errors = result.errors,
      "resolution pass completed"
    );
    Ok(result)
  }

  /// Pending merge proposals with names resolved, for review surfaces.
  pub async fn pending_merges(&self) -> Result<Vec<PendingMerge>> {
    self.store.pending_merges().await.map_err(Error::store)
  }

  pub async fn resolution_stats(&self) -> Result<ResolutionStats> {
    self.store.resolution_stats().await.map_err(Error::store)
  }
}
