//! Aggregate results returned to consumers of the engine.

use serde::Serialize;

/// Outcome of one `run_full_resolution` call.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ResolutionResult {
  pub hard_collisions:           usize,
  pub compound_matches:          usize,
  pub soft_accumulations:        usize,
  pub merge_suggestions_created: usize,
  pub auto_merges_executed:      usize,
  pub errors:                    usize,
}

/// Outcome of one extraction-ingestion run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncStats {
  pub analysis_runs_processed: usize,
  pub facets_processed:        usize,
  pub facts_created:           usize,
  pub facts_updated:           usize,
  pub unattributed_created:    usize,
  pub third_parties_created:   usize,
  pub errors:                  usize,
}

/// A point-in-time snapshot of resolution state.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ResolutionStats {
  /// Persons not yet consumed by a merge.
  pub active_persons:        i64,
  pub merged_persons:        i64,
  pub total_facts:           i64,
  pub hard_identifiers:      i64,
  pub pending_merges:        i64,
  pub auto_eligible_merges:  i64,
  /// Unattributed facts awaiting review.
  pub unresolved_facts:      i64,
  /// Persons with facts from at least two distinct source channels.
  pub cross_channel_linked:  i64,
}
