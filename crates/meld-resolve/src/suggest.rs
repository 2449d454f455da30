//! Heuristic merge suggestions for human review.
//!
//! Two generators: normalized-name similarity between persons with enough
//! event history, and shared private email domains. Both are deliberately
//! weaker signals than anything in the merge-event stream, which is why
//! they only ever surface to a reviewer.

use std::collections::{HashMap, HashSet};

use meld_core::{
  Error as DomainError,
  merge::PersonPair,
  person::Person,
  store::IdentityStore,
  suggestion::{
    MergeSuggestion, NewSuggestion, SuggestionEvidenceType, SuggestionStatus,
  },
};
use uuid::Uuid;

use crate::{Error, Resolver, Result};

/// Freemail and similar providers: a shared domain here says nothing about
/// identity.
const PUBLIC_EMAIL_DOMAINS: &[&str] = &[
  "gmail.com",
  "yahoo.com",
  "hotmail.com",
  "outlook.com",
  "icloud.com",
  "aol.com",
  "proton.me",
  "protonmail.com",
  "live.com",
  "msn.com",
  "me.com",
  "mac.com",
];

/// Generational suffixes dropped during name normalization.
const NAME_SUFFIXES: &[&str] = &["jr", "jr.", "sr", "sr.", "ii", "iii"];

impl<S: IdentityStore> Resolver<S> {
  /// Generate heuristic suggestions. Existing pending suggestions suppress
  /// new ones for the same unordered pair; output is capped and floored by
  /// the config. Returns the number created.
  pub async fn generate_suggestions(&self) -> Result<usize> {
    let persons = self
      .store
      .persons_with_event_counts()
      .await
      .map_err(Error::store)?;

    let mut suppressed: HashSet<PersonPair> = self
      .store
      .pending_suggestion_pairs()
      .await
      .map_err(Error::store)?
      .into_iter()
      .collect();

    let mut candidates = self.name_similarity_candidates(&persons);
    candidates.extend(self.shared_domain_candidates(&persons).await?);

    // Strongest evidence first; one suggestion per pair.
    candidates.sort_by(|a, b| {
      b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut created = 0;
    for candidate in candidates {
      if created >= self.config.max_suggestions {
        tracing::debug!(
          cap = self.config.max_suggestions,
          "suggestion cap reached; remaining candidates dropped"
        );
        break;
      }
      if candidate.confidence < self.config.suggestion_min_confidence {
        continue;
      }
      let pair = PersonPair::new(candidate.person1_id, candidate.person2_id);
      if suppressed.contains(&pair) {
        continue;
      }

      self
        .store
        .insert_suggestion(candidate)
        .await
        .map_err(Error::store)?;
      suppressed.insert(pair);
      created += 1;
    }

    tracing::info!(created, "suggestion generation completed");
    Ok(created)
  }

  fn name_similarity_candidates(
    &self,
    persons: &[(Person, i64)],
  ) -> Vec<NewSuggestion> {
    let named: Vec<(&Person, i64, String)> = persons
      .iter()
      .filter(|(_, count)| *count >= self.config.suggestion_min_event_count)
      .filter_map(|(person, count)| {
        normalize_person_name(&person.canonical_name)
          .map(|n| (person, *count, n))
      })
      .collect();

    let mut out = Vec::new();
    for (i, (p1, c1, n1)) in named.iter().enumerate() {
      for (p2, c2, n2) in &named[i + 1..] {
        let confidence = if n1 == n2 {
          0.8
        } else if name_contains(n1, n2) {
          0.6
        } else {
          continue;
        };

        out.push(NewSuggestion {
          person1_id:          p1.person_id,
          person2_id:          p2.person_id,
          evidence_type:       SuggestionEvidenceType::NameSimilarity,
          evidence:            serde_json::json!({
            "person1_name": p1.canonical_name,
            "person2_name": p2.canonical_name,
            "normalized": [n1, n2],
          }),
          confidence,
          person1_event_count: *c1,
          person2_event_count: *c2,
        });
      }
    }
    out
  }

  async fn shared_domain_candidates(
    &self,
    persons: &[(Person, i64)],
  ) -> Result<Vec<NewSuggestion>> {
    // domain → persons holding an address there. Only private domains are
    // informative.
    let mut by_domain: HashMap<String, Vec<Uuid>> = HashMap::new();
    let mut event_counts: HashMap<Uuid, i64> = HashMap::new();

    for (person, count) in persons {
      event_counts.insert(person.person_id, *count);
      let emails = self
        .store
        .person_emails(person.person_id)
        .await
        .map_err(Error::store)?;

      let mut domains: Vec<String> = emails
        .iter()
        .filter_map(|e| email_domain(e))
        .filter(|d| !is_public_email_domain(d))
        .map(str::to_owned)
        .collect();
      domains.sort();
      domains.dedup();

      for domain in domains {
        by_domain.entry(domain).or_default().push(person.person_id);
      }
    }

    let mut out = Vec::new();
    for (domain, members) in by_domain {
      if members.len() < 2 {
        continue;
      }
      for (i, &p1) in members.iter().enumerate() {
        for &p2 in &members[i + 1..] {
          out.push(NewSuggestion {
            person1_id:          p1,
            person2_id:          p2,
            evidence_type:       SuggestionEvidenceType::SharedDomain,
            evidence:            serde_json::json!({ "domain": domain }),
            confidence:          0.5,
            person1_event_count: event_counts.get(&p1).copied().unwrap_or(0),
            person2_event_count: event_counts.get(&p2).copied().unwrap_or(0),
          });
        }
      }
    }
    Ok(out)
  }

  // ── Review actions ──────────────────────────────────────────────────────

  /// Accept a suggestion: merge person2 into person1 (the person-level
  /// path — no merge event, no conflict veto), then mark accepted.
  pub async fn accept_suggestion(
    &self,
    suggestion_id: Uuid,
  ) -> Result<MergeSuggestion> {
    let suggestion = self
      .store
      .get_suggestion(suggestion_id)
      .await
      .map_err(Error::store)?
      .ok_or(DomainError::SuggestionNotFound(suggestion_id))?;

    // Even the heuristic path never consumes the user.
    if let Some(me) = self.store.me_person().await.map_err(Error::store)?
      && me.person_id == suggestion.person2_id
    {
      return Err(DomainError::CannotMergeMe(me.person_id).into());
    }

    self
      .store
      .merge_persons(suggestion.person2_id, suggestion.person1_id)
      .await
      .map_err(Error::store)?;
    self
      .store
      .set_suggestion_status(suggestion_id, SuggestionStatus::Accepted)
      .await
      .map_err(Error::store)?;

    tracing::info!(
      suggestion_id = %suggestion_id,
      source = %suggestion.person2_id,
      target = %suggestion.person1_id,
      "suggestion accepted and persons merged"
    );
    Ok(suggestion)
  }

  /// Reject a suggestion without touching persons.
  pub async fn reject_suggestion(&self, suggestion_id: Uuid) -> Result<()> {
    self
      .store
      .set_suggestion_status(suggestion_id, SuggestionStatus::Rejected)
      .await
      .map_err(Error::store)
  }

  /// Expire pending suggestions whose persons are gone or merged away.
  /// Returns the number expired.
  pub async fn cleanup_expired_suggestions(&self) -> Result<usize> {
    let pending = self
      .store
      .list_suggestions(Some(SuggestionStatus::Pending))
      .await
      .map_err(Error::store)?;

    let mut expired = 0;
    for suggestion in pending {
      let mut gone = false;
      for person_id in [suggestion.person1_id, suggestion.person2_id] {
        let person = self
          .store
          .get_person(person_id)
          .await
          .map_err(Error::store)?;
        if person.is_none_or(|p| p.is_merged()) {
          gone = true;
        }
      }
      if gone {
        self
          .store
          .set_suggestion_status(
            suggestion.suggestion_id,
            SuggestionStatus::Expired,
          )
          .await
          .map_err(Error::store)?;
        expired += 1;
      }
    }
    Ok(expired)
  }
}

// ─── Name normalization ──────────────────────────────────────────────────────

/// Normalize a canonical name for similarity comparison. Returns `None`
/// when the result is unusable as a name: shorter than 3 chars, an email
/// address, or a phone number.
fn normalize_person_name(name: &str) -> Option<String> {
  let lowered = name.trim().to_lowercase();

  let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
  while let Some(last) = tokens.last() {
    if NAME_SUFFIXES.contains(last) {
      tokens.pop();
    } else {
      break;
    }
  }

  let normalized = tokens.join(" ");
  if normalized.len() < 3
    || normalized.contains('@')
    || normalized.starts_with('+')
  {
    return None;
  }
  Some(normalized)
}

/// Substring containment counts only when the shorter name is substantial:
/// at least 4 chars and more than half the longer name's length.
fn name_contains(a: &str, b: &str) -> bool {
  let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
  shorter.len() >= 4
    && (shorter.len() as f64) / (longer.len() as f64) > 0.5
    && longer.contains(shorter)
}

fn email_domain(email: &str) -> Option<&str> {
  email
    .rsplit_once('@')
    .map(|(_, domain)| domain)
    .filter(|d| !d.is_empty())
}

fn is_public_email_domain(domain: &str) -> bool {
  PUBLIC_EMAIL_DOMAINS.contains(&domain.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalization_strips_suffixes_and_collapses_whitespace() {
    assert_eq!(
      normalize_person_name("  Robert   Paulson  Jr. ").as_deref(),
      Some("robert paulson")
    );
    assert_eq!(
      normalize_person_name("Henry Adams III").as_deref(),
      Some("henry adams")
    );
  }

  #[test]
  fn unusable_names_are_skipped() {
    assert_eq!(normalize_person_name("Al"), None);
    assert_eq!(normalize_person_name("bob@example.com"), None);
    assert_eq!(normalize_person_name("+15125550100"), None);
  }

  #[test]
  fn containment_needs_substantial_overlap() {
    assert!(name_contains("dana hu", "dana"));
    // Shorter than 4 chars never counts.
    assert!(!name_contains("dan", "dana hu"));
    // Ratio at or below one half never counts.
    assert!(!name_contains("dana", "dana hu and friends"));
  }

  #[test]
  fn public_domains_are_not_evidence() {
    assert!(is_public_email_domain("gmail.com"));
    assert!(is_public_email_domain("proton.me"));
    assert!(!is_public_email_domain("initech.com"));
    assert_eq!(email_domain("bob@initech.com"), Some("initech.com"));
    assert_eq!(email_domain("not-an-email"), None);
  }
}
