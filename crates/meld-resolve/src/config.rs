//! Engine tunables.

/// Thresholds and caps for one [`crate::Resolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
  /// Collision groups larger than this are discarded as too ambiguous —
  /// common-domain addresses, shared office phones, and the like would
  /// otherwise explode into useless pairs.
  pub max_group_size:             usize,
  /// Soft-score candidate floor: pairs below it are dropped outright.
  pub soft_score_floor:           f64,
  /// Soft-score threshold for actually proposing a merge.
  pub soft_merge_threshold:       f64,
  /// Hard-identifier proposals at or above this average confidence are
  /// auto-eligible.
  pub auto_merge_threshold:       f64,
  /// Both persons need at least this many events before a name-similarity
  /// suggestion is considered.
  pub suggestion_min_event_count: i64,
  /// Suggestions below this confidence are not surfaced.
  pub suggestion_min_confidence:  f64,
  /// Cap on suggestions created per generation run.
  pub max_suggestions:            usize,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self {
      max_group_size:             50,
      soft_score_floor:           0.4,
      soft_merge_threshold:       0.6,
      auto_merge_threshold:       0.8,
      suggestion_min_event_count: 5,
      suggestion_min_confidence:  0.5,
      max_suggestions:            100,
    }
  }
}
