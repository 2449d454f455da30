//! [`SqliteStore`] — the SQLite implementation of [`IdentityStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use meld_core::{
  collision::{CompoundMatch, CompoundRule, FactCollision},
  contact::{Contact, ContactIdentifier, LinkSource},
  event::{Event, NewEvent, ParticipantRole},
  fact::{
    self, FactCategory, FactUpsert, NewFact, PersonFact, UpsertOutcome,
  },
  identifier::{self, IdentifierKind},
  mention::{CandidateMention, NewCandidateMention, NewUnattributedFact},
  merge::{
    MergeEvent, MergeStatus, NewMergeEvent, PendingMerge, PersonPair,
    merge_marker,
  },
  person::{NewPerson, Person},
  report::ResolutionStats,
  store::IdentityStore,
  suggestion::{MergeSuggestion, NewSuggestion, SuggestionStatus},
};

use crate::{
  Error, Result,
  encode::{
    CONTACT_COLS, EVENT_COLS, FACT_COLS, MERGE_COLS, PERSON_COLS,
    RawContact, RawFact, RawMergeEvent, RawPerson, SUGGESTION_COLS,
    contact_from_row, decode_identifier_kind, decode_uuid, encode_string_vec,
    encode_triggering_facts, encode_ts, encode_uuid, event_from_row,
    fact_from_row, mention_from_row, merge_from_row, person_from_row,
    suggestion_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Meld identity store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All access
/// funnels through one worker thread, which is what makes this store the
/// single writer the resolution engine assumes.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Relocate facts and links from `source` to `target` and mark the source
  /// person merged. Runs inside the caller's transaction. Target rows win
  /// fact collisions on the unique key: colliding source rows are deleted
  /// before the reassignment UPDATE.
  ///
  /// Returns `false` (signalling rollback) when the source person is
  /// missing or already merged.
  fn merge_person_rows(
    tx:     &rusqlite::Transaction<'_>,
    source: &str,
    target: &str,
    marker: &str,
    now:    i64,
  ) -> rusqlite::Result<bool> {
    tx.execute(
      "DELETE FROM person_facts
       WHERE person_id = ?1
         AND EXISTS (
           SELECT 1 FROM person_facts t
           WHERE t.person_id = ?2
             AND t.category = person_facts.category
             AND t.fact_type = person_facts.fact_type
             AND t.fact_value = person_facts.fact_value
         )",
      rusqlite::params![source, target],
    )?;

    tx.execute(
      "UPDATE person_facts SET person_id = ?2, updated_at = ?3
       WHERE person_id = ?1",
      rusqlite::params![source, target, now],
    )?;

    tx.execute(
      "INSERT OR IGNORE INTO person_contact_links
         (person_id, contact_id, source, confidence)
       SELECT ?2, contact_id, 'merge', confidence
       FROM person_contact_links WHERE person_id = ?1",
      rusqlite::params![source, target],
    )?;
    tx.execute(
      "DELETE FROM person_contact_links WHERE person_id = ?1",
      rusqlite::params![source],
    )?;

    let marked = tx.execute(
      "UPDATE persons
       SET merged_into = ?2,
           canonical_name = canonical_name || ?3,
           updated_at = ?4
       WHERE person_id = ?1 AND merged_into IS NULL",
      rusqlite::params![source, target, marker, now],
    )?;

    Ok(marked == 1)
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  // ── Events ────────────────────────────────────────────────────────────────

  async fn insert_event(&self, input: NewEvent) -> Result<(Event, bool)> {
    let event_id = encode_uuid(Uuid::new_v4());
    let ts = encode_ts(input.timestamp);
    let content_types = encode_string_vec(&input.content_types)?;

    let (raw, created) = self
      .conn
      .call(move |conn| {
        let sql =
          format!("SELECT {EVENT_COLS} FROM events WHERE source_adapter = ?1 AND source_id = ?2");
        let existing = conn
          .query_row(
            &sql,
            rusqlite::params![input.source_adapter, input.source_id],
            event_from_row,
          )
          .optional()?;

        if let Some(raw) = existing {
          return Ok((raw, false));
        }

        conn.execute(
          "INSERT INTO events (
             event_id, timestamp, channel, content_types, content,
             direction, thread_id, source_adapter, source_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            event_id,
            ts,
            input.channel,
            content_types,
            input.content,
            input.direction.as_str(),
            input.thread_id,
            input.source_adapter,
            input.source_id,
          ],
        )?;

        let sql = format!("SELECT {EVENT_COLS} FROM events WHERE event_id = ?1");
        let raw = conn.query_row(&sql, rusqlite::params![event_id], event_from_row)?;
        Ok((raw, true))
      })
      .await?;

    Ok((raw.into_event()?, created))
  }

  async fn add_event_participant(
    &self,
    event_id:   Uuid,
    contact_id: Uuid,
    role:       ParticipantRole,
  ) -> Result<()> {
    let event_id = encode_uuid(event_id);
    let contact_id = encode_uuid(contact_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO event_participants (event_id, contact_id, role)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![event_id, contact_id, role.as_str()],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn assign_event_segment(
    &self,
    segment_id: &str,
    event_id:   Uuid,
  ) -> Result<()> {
    let segment_id = segment_id.to_owned();
    let event_id = encode_uuid(event_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO segment_events (segment_id, event_id)
           VALUES (?1, ?2)",
          rusqlite::params![segment_id, event_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Contact registry ──────────────────────────────────────────────────────

  async fn get_or_create_contact(
    &self,
    kind:         IdentifierKind,
    identifier:   &str,
    display_name: Option<&str>,
    source:       &str,
  ) -> Result<(Contact, bool)> {
    // Reject malformed identifiers before any registry touch.
    let normalized = identifier::normalize(identifier, kind)?;
    let value = identifier.trim().to_owned();
    let display_name = display_name.map(str::to_owned);
    let source = source.to_owned();
    let contact_id = encode_uuid(Uuid::new_v4());
    let now = encode_ts(Utc::now());

    let (raw, created) = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT c.{} FROM contacts c
           JOIN contact_identifiers ci ON ci.contact_id = c.contact_id
           WHERE ci.kind = ?1 AND ci.normalized = ?2",
          CONTACT_COLS.replace(", ", ", c.")
        );
        let existing = conn
          .query_row(
            &sql,
            rusqlite::params![kind.as_str(), normalized],
            contact_from_row,
          )
          .optional()?;

        if let Some(raw) = existing {
          return Ok((raw, false));
        }

        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO contacts (contact_id, display_name, source, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![contact_id, display_name, source, now],
        )?;
        tx.execute(
          "INSERT INTO contact_identifiers (contact_id, kind, value, normalized)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![contact_id, kind.as_str(), value, normalized],
        )?;
        tx.commit()?;

        Ok((
          RawContact {
            contact_id: contact_id.clone(),
            display_name,
            source,
            created_at: now,
            updated_at: now,
          },
          true,
        ))
      })
      .await?;

    Ok((raw.into_contact()?, created))
  }

  async fn find_contact(
    &self,
    kind:       IdentifierKind,
    identifier: &str,
  ) -> Result<Option<Contact>> {
    let normalized = identifier::normalize(identifier, kind)?;

    let raw = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT c.{} FROM contacts c
           JOIN contact_identifiers ci ON ci.contact_id = c.contact_id
           WHERE ci.kind = ?1 AND ci.normalized = ?2",
          CONTACT_COLS.replace(", ", ", c.")
        );
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![kind.as_str(), normalized],
              contact_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn contact_identifiers(
    &self,
    contact_id: Uuid,
  ) -> Result<Vec<ContactIdentifier>> {
    let id_str = encode_uuid(contact_id);

    let rows: Vec<(String, String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT kind, value, normalized FROM contact_identifiers
           WHERE contact_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(kind, value, normalized)| {
        Ok(ContactIdentifier {
          contact_id,
          kind: decode_identifier_kind(&kind)?,
          value,
          normalized,
        })
      })
      .collect()
  }

  async fn ensure_person_contact_link(
    &self,
    person_id:  Uuid,
    contact_id: Uuid,
    source:     LinkSource,
    confidence: f64,
  ) -> Result<()> {
    let person_id = encode_uuid(person_id);
    let contact_id = encode_uuid(contact_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO person_contact_links (person_id, contact_id, source, confidence)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (person_id, contact_id)
           DO UPDATE SET confidence = MAX(confidence, excluded.confidence)",
          rusqlite::params![person_id, contact_id, source.as_str(), confidence],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn ensure_person_for_contact(
    &self,
    contact_id:   Uuid,
    display_name: Option<&str>,
    source:       LinkSource,
    confidence:   f64,
  ) -> Result<(Person, bool)> {
    let contact_str = encode_uuid(contact_id);
    let canonical = display_name.unwrap_or("Unknown").to_owned();
    let display_name = display_name.map(str::to_owned);
    let person_id = encode_uuid(Uuid::new_v4());
    let now = encode_ts(Utc::now());

    let (raw, created) = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT p.{} FROM persons p
           JOIN person_contact_links l ON l.person_id = p.person_id
           WHERE l.contact_id = ?1
           ORDER BY p.created_at",
          PERSON_COLS.replace(", ", ", p.")
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut linked = stmt
          .query_map(rusqlite::params![contact_str], person_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        // Reuse only when the contact resolves unambiguously.
        if linked.len() == 1 {
          return Ok((linked.swap_remove(0), false));
        }

        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO persons (
             person_id, canonical_name, display_name, is_me,
             relationship_type, merged_into, created_at, updated_at
           ) VALUES (?1, ?2, ?3, 0, NULL, NULL, ?4, ?4)",
          rusqlite::params![person_id, canonical, display_name, now],
        )?;
        tx.execute(
          "INSERT OR IGNORE INTO person_contact_links
             (person_id, contact_id, source, confidence)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![person_id, contact_str, source.as_str(), confidence],
        )?;
        tx.commit()?;

        Ok((
          RawPerson {
            person_id:         person_id.clone(),
            canonical_name:    canonical,
            display_name,
            is_me:             false,
            relationship_type: None,
            merged_into:       None,
            created_at:        now,
            updated_at:        now,
          },
          true,
        ))
      })
      .await?;

    Ok((raw.into_person()?, created))
  }

  async fn persons_for_contact(&self, contact_id: Uuid) -> Result<Vec<Person>> {
    let contact_str = encode_uuid(contact_id);

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT p.{} FROM persons p
           JOIN person_contact_links l ON l.person_id = p.person_id
           WHERE l.contact_id = ?1
           ORDER BY p.created_at",
          PERSON_COLS.replace(", ", ", p.")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![contact_str], person_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn create_person(&self, input: NewPerson) -> Result<Person> {
    let person_id = encode_uuid(Uuid::new_v4());
    let now = encode_ts(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO persons (
             person_id, canonical_name, display_name, is_me,
             relationship_type, merged_into, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)",
          rusqlite::params![
            person_id,
            input.canonical_name,
            input.display_name,
            input.is_me,
            input.relationship_type,
            now,
          ],
        )?;
        Ok(RawPerson {
          person_id:         person_id.clone(),
          canonical_name:    input.canonical_name,
          display_name:      input.display_name,
          is_me:             input.is_me,
          relationship_type: input.relationship_type,
          merged_into:       None,
          created_at:        now,
          updated_at:        now,
        })
      })
      .await?;

    raw.into_person()
  }

  async fn get_person(&self, person_id: Uuid) -> Result<Option<Person>> {
    let id_str = encode_uuid(person_id);

    let raw = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {PERSON_COLS} FROM persons WHERE person_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], person_from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn me_person(&self) -> Result<Option<Person>> {
    let raw = self
      .conn
      .call(|conn| {
        let sql = format!("SELECT {PERSON_COLS} FROM persons WHERE is_me = 1");
        Ok(conn.query_row(&sql, [], person_from_row).optional()?)
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn find_persons_by_name(&self, fragment: &str) -> Result<Vec<Person>> {
    let needle = fragment.trim().to_lowercase();
    if needle.is_empty() {
      return Ok(Vec::new());
    }

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {PERSON_COLS} FROM persons
           WHERE merged_into IS NULL
             AND (instr(lower(canonical_name), ?1) > 0
               OR instr(lower(COALESCE(display_name, '')), ?1) > 0)
           ORDER BY created_at"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![needle], person_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn list_persons(&self, include_merged: bool) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let sql = if include_merged {
          format!("SELECT {PERSON_COLS} FROM persons ORDER BY created_at")
        } else {
          format!(
            "SELECT {PERSON_COLS} FROM persons
             WHERE merged_into IS NULL ORDER BY created_at"
          )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], person_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn segment_participants(&self, segment_id: &str) -> Result<Vec<Person>> {
    let segment_id = segment_id.to_owned();

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT DISTINCT p.{} FROM persons p
           JOIN person_contact_links l ON l.person_id = p.person_id
           JOIN event_participants ep ON ep.contact_id = l.contact_id
           JOIN segment_events se ON se.event_id = ep.event_id
           WHERE se.segment_id = ?1 AND p.merged_into IS NULL
           ORDER BY p.created_at",
          PERSON_COLS.replace(", ", ", p.")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![segment_id], person_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn persons_with_event_counts(&self) -> Result<Vec<(Person, i64)>> {
    let raws: Vec<(RawPerson, i64)> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT p.{}, COUNT(DISTINCT ep.event_id) AS event_count
           FROM persons p
           LEFT JOIN person_contact_links l ON l.person_id = p.person_id
           LEFT JOIN event_participants ep ON ep.contact_id = l.contact_id
           WHERE p.merged_into IS NULL
           GROUP BY p.person_id
           ORDER BY p.created_at",
          PERSON_COLS.replace(", ", ", p.")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| Ok((person_from_row(row)?, row.get(8)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, count)| Ok((raw.into_person()?, count)))
      .collect()
  }

  async fn person_emails(&self, person_id: Uuid) -> Result<Vec<String>> {
    let id_str = encode_uuid(person_id);

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT ci.normalized FROM contact_identifiers ci
           JOIN person_contact_links l ON l.contact_id = ci.contact_id
           WHERE l.person_id = ?1 AND ci.kind = 'email'
           UNION
           SELECT lower(trim(fact_value)) FROM person_facts
           WHERE person_id = ?1 AND fact_type LIKE 'email\\_%' ESCAPE '\\'",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows)
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn insert_fact(&self, input: NewFact) -> Result<FactUpsert> {
    // Identifier flags are intrinsic to the fact type, never caller-supplied.
    let is_hard = fact::is_hard_identifier(&input.fact_type);
    let is_ident = fact::is_identifier(&input.fact_type);
    let fact_id = encode_uuid(Uuid::new_v4());
    let person_id = encode_uuid(input.person_id);
    let now = encode_ts(Utc::now());

    let (raw, inserted) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let select = format!(
          "SELECT {FACT_COLS} FROM person_facts
           WHERE person_id = ?1 AND category = ?2
             AND fact_type = ?3 AND fact_value = ?4"
        );
        let existing = tx
          .query_row(
            &select,
            rusqlite::params![
              person_id,
              input.category.as_str(),
              input.fact_type,
              input.fact_value,
            ],
            fact_from_row,
          )
          .optional()?;

        let raw = if let Some(existing) = existing {
          // Confidence is monotonically non-decreasing; provenance fills in.
          tx.execute(
            "UPDATE person_facts SET
               confidence      = MAX(confidence, ?2),
               source_channel  = COALESCE(source_channel, ?3),
               source_segment  = COALESCE(source_segment, ?4),
               source_facet_id = COALESCE(source_facet_id, ?5),
               evidence        = COALESCE(evidence, ?6),
               updated_at      = ?7
             WHERE fact_id = ?1",
            rusqlite::params![
              existing.fact_id,
              input.confidence,
              input.source_channel,
              input.source_segment,
              input.source_facet_id,
              input.evidence,
              now,
            ],
          )?;
          let sql = format!("SELECT {FACT_COLS} FROM person_facts WHERE fact_id = ?1");
          let raw =
            tx.query_row(&sql, rusqlite::params![existing.fact_id], fact_from_row)?;
          tx.commit()?;
          (raw, false)
        } else {
          tx.execute(
            "INSERT INTO person_facts (
               fact_id, person_id, category, fact_type, fact_value,
               confidence, source_type, source_channel, source_segment,
               source_facet_id, evidence, is_sensitive, is_identifier,
               is_hard_identifier, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
            rusqlite::params![
              fact_id,
              person_id,
              input.category.as_str(),
              input.fact_type,
              input.fact_value,
              input.confidence,
              input.source_type,
              input.source_channel,
              input.source_segment,
              input.source_facet_id,
              input.evidence,
              input.is_sensitive,
              is_ident,
              is_hard,
              now,
            ],
          )?;
          let sql = format!("SELECT {FACT_COLS} FROM person_facts WHERE fact_id = ?1");
          let raw = tx.query_row(&sql, rusqlite::params![fact_id], fact_from_row)?;
          tx.commit()?;
          (raw, true)
        };

        Ok(raw)
      })
      .await?;

    Ok(FactUpsert {
      fact:    raw.into_fact()?,
      outcome: if inserted {
        UpsertOutcome::Inserted
      } else {
        UpsertOutcome::Updated
      },
    })
  }

  async fn facts_for_person(&self, person_id: Uuid) -> Result<Vec<PersonFact>> {
    let id_str = encode_uuid(person_id);

    let raws: Vec<RawFact> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {FACT_COLS} FROM person_facts
           WHERE person_id = ?1 ORDER BY category, fact_type, fact_value"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], fact_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFact::into_fact).collect()
  }

  async fn facts_for_person_in_category(
    &self,
    person_id: Uuid,
    category:  FactCategory,
  ) -> Result<Vec<PersonFact>> {
    let id_str = encode_uuid(person_id);

    let raws: Vec<RawFact> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {FACT_COLS} FROM person_facts
           WHERE person_id = ?1 AND category = ?2
           ORDER BY fact_type, fact_value"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![id_str, category.as_str()],
            fact_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFact::into_fact).collect()
  }

  async fn facts_of_type(&self, fact_type: &str) -> Result<Vec<PersonFact>> {
    let fact_type = fact_type.to_owned();

    let raws: Vec<RawFact> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {FACT_COLS} FROM person_facts
           WHERE fact_type = ?1 ORDER BY fact_value, person_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![fact_type], fact_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFact::into_fact).collect()
  }

  async fn hard_identifier_facts(&self) -> Result<Vec<PersonFact>> {
    let raws: Vec<RawFact> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {FACT_COLS} FROM person_facts
           WHERE is_hard_identifier = 1
           ORDER BY fact_type, fact_value, person_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], fact_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFact::into_fact).collect()
  }

  // ── Collision detection ───────────────────────────────────────────────────

  async fn fact_collisions(&self, fact_type: &str) -> Result<Vec<FactCollision>> {
    let fact_type = fact_type.to_owned();

    let rows: Vec<(String, String, String, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT fact_type, fact_value, person_id, confidence
           FROM person_facts
           WHERE fact_type = ?1
           ORDER BY fact_type, fact_value, person_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![fact_type], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    fold_collisions(rows)
  }

  async fn hard_identifier_collisions(&self) -> Result<Vec<FactCollision>> {
    let rows: Vec<(String, String, String, f64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT fact_type, fact_value, person_id, confidence
           FROM person_facts
           WHERE is_hard_identifier = 1
           ORDER BY fact_type, fact_value, person_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    fold_collisions(rows)
  }

  async fn name_birthdate_matches(&self) -> Result<Vec<CompoundMatch>> {
    let rows: Vec<(String, String, String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT n1.person_id, n2.person_id, n1.fact_value, b1.fact_value
           FROM person_facts n1
           JOIN person_facts n2
             ON  n2.fact_type = 'full_legal_name'
             AND n2.fact_value = n1.fact_value
             AND n1.person_id < n2.person_id
           JOIN person_facts b1
             ON  b1.person_id = n1.person_id AND b1.fact_type = 'birthdate'
           JOIN person_facts b2
             ON  b2.person_id = n2.person_id AND b2.fact_type = 'birthdate'
             AND b2.fact_value = b1.fact_value
           WHERE n1.fact_type = 'full_legal_name'",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(a, b, name, birthdate)| {
        Ok(CompoundMatch {
          person_a: decode_uuid(&a)?,
          person_b: decode_uuid(&b)?,
          rule:     CompoundRule::NameBirthdate,
          shared:   vec![
            triggering("full_legal_name", name),
            triggering("birthdate", birthdate),
          ],
        })
      })
      .collect()
  }

  async fn name_employer_location_matches(&self) -> Result<Vec<CompoundMatch>> {
    let rows: Vec<(String, String, String, String, String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT n1.person_id, n2.person_id, n1.fact_type,
                  n1.fact_value, e1.fact_value, l1.fact_value
           FROM person_facts n1
           JOIN person_facts n2
             ON  n2.fact_type = n1.fact_type
             AND n2.fact_value = n1.fact_value
             AND n1.person_id < n2.person_id
           JOIN person_facts e1
             ON  e1.person_id = n1.person_id
             AND e1.fact_type = 'employer_current'
           JOIN person_facts e2
             ON  e2.person_id = n2.person_id
             AND e2.fact_type = 'employer_current'
             AND e2.fact_value = e1.fact_value
           JOIN person_facts l1
             ON  l1.person_id = n1.person_id
             AND l1.fact_type = 'location_current'
           JOIN person_facts l2
             ON  l2.person_id = n2.person_id
             AND l2.fact_type = 'location_current'
             AND l2.fact_value = l1.fact_value
           WHERE n1.fact_type IN ('full_legal_name', 'given_name')",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((
              row.get(0)?,
              row.get(1)?,
              row.get(2)?,
              row.get(3)?,
              row.get(4)?,
              row.get(5)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(a, b, name_type, name, employer, location)| {
        Ok(CompoundMatch {
          person_a: decode_uuid(&a)?,
          person_b: decode_uuid(&b)?,
          rule:     CompoundRule::NameEmployerLocation,
          shared:   vec![
            triggering(&name_type, name),
            triggering("employer_current", employer),
            triggering("location_current", location),
          ],
        })
      })
      .collect()
  }

  // ── Merge events ──────────────────────────────────────────────────────────

  async fn insert_merge_event(
    &self,
    input: NewMergeEvent,
  ) -> Result<Option<MergeEvent>> {
    let merge_id = Uuid::new_v4();
    let pair = PersonPair::new(input.source_person_id, input.target_person_id);
    let merge_id_str = encode_uuid(merge_id);
    let source_str = encode_uuid(input.source_person_id);
    let target_str = encode_uuid(input.target_person_id);
    let pair_lo = encode_uuid(pair.lo());
    let pair_hi = encode_uuid(pair.hi());
    let facts_json = encode_triggering_facts(&input.triggering_facts)?;
    let now = encode_ts(Utc::now());
    let merge_type = input.merge_type;
    let score = input.similarity_score;
    let auto = input.auto_eligible;

    let created = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO merge_events (
             merge_id, source_person_id, target_person_id, pair_lo, pair_hi,
             merge_type, triggering_facts, similarity_score, status,
             auto_eligible, created_at, resolved_at, resolved_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', ?9, ?10, NULL, NULL)",
          rusqlite::params![
            merge_id_str,
            source_str,
            target_str,
            pair_lo,
            pair_hi,
            merge_type.as_str(),
            facts_json,
            score,
            auto,
            now,
          ],
        )?;
        Ok(n == 1)
      })
      .await?;

    if !created {
      return Ok(None);
    }

    Ok(Some(MergeEvent {
      merge_id,
      source_person_id: input.source_person_id,
      target_person_id: input.target_person_id,
      merge_type:       input.merge_type,
      triggering_facts: input.triggering_facts,
      similarity_score: input.similarity_score,
      status:           MergeStatus::Pending,
      auto_eligible:    input.auto_eligible,
      created_at:       crate::encode::decode_ts(now)?,
      resolved_at:      None,
      resolved_by:      None,
    }))
  }

  async fn get_merge_event(&self, merge_id: Uuid) -> Result<Option<MergeEvent>> {
    let id_str = encode_uuid(merge_id);

    let raw = self
      .conn
      .call(move |conn| {
        let sql =
          format!("SELECT {MERGE_COLS} FROM merge_events WHERE merge_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], merge_from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMergeEvent::into_merge_event).transpose()
  }

  async fn merge_pairs(&self) -> Result<Vec<PersonPair>> {
    let rows: Vec<(String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT pair_lo, pair_hi FROM merge_events")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(lo, hi)| Ok(PersonPair::new(decode_uuid(&lo)?, decode_uuid(&hi)?)))
      .collect()
  }

  async fn pending_merges(&self) -> Result<Vec<PendingMerge>> {
    let raws: Vec<(RawMergeEvent, String, String)> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT m.{}, ps.canonical_name, pt.canonical_name
           FROM merge_events m
           JOIN persons ps ON ps.person_id = m.source_person_id
           JOIN persons pt ON pt.person_id = m.target_person_id
           WHERE m.status = 'pending'
           ORDER BY m.created_at",
          MERGE_COLS.replace(", ", ", m.")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| {
            Ok((merge_from_row(row)?, row.get(11)?, row.get(12)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, source_name, target_name)| {
        Ok(PendingMerge {
          merge: raw.into_merge_event()?,
          source_name,
          target_name,
        })
      })
      .collect()
  }

  async fn pending_auto_merges(&self) -> Result<Vec<MergeEvent>> {
    let raws: Vec<RawMergeEvent> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {MERGE_COLS} FROM merge_events
           WHERE status = 'pending' AND auto_eligible = 1
           ORDER BY created_at"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], merge_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawMergeEvent::into_merge_event)
      .collect()
  }

  async fn downgrade_merge(&self, merge_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(merge_id);

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE merge_events SET auto_eligible = 0 WHERE merge_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(n)
      })
      .await?;

    if changed == 0 {
      return Err(Error::MergeNotFound(merge_id));
    }
    Ok(())
  }

  async fn reject_merge(&self, merge_id: Uuid, resolved_by: &str) -> Result<()> {
    let id_str = encode_uuid(merge_id);
    let resolved_by = resolved_by.to_owned();
    let now = encode_ts(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE merge_events
           SET status = 'rejected', resolved_at = ?2, resolved_by = ?3
           WHERE merge_id = ?1 AND status = 'pending'",
          rusqlite::params![id_str, now, resolved_by],
        )?;
        Ok(n)
      })
      .await?;

    if changed == 0 {
      return match self.get_merge_event(merge_id).await? {
        Some(_) => Err(Error::MergeAlreadyResolved(merge_id)),
        None => Err(Error::MergeNotFound(merge_id)),
      };
    }
    Ok(())
  }

  async fn execute_merge(&self, merge_id: Uuid, resolved_by: &str) -> Result<()> {
    let merge = self
      .get_merge_event(merge_id)
      .await?
      .ok_or(Error::MergeNotFound(merge_id))?;
    if merge.status != MergeStatus::Pending {
      return Err(Error::MergeAlreadyResolved(merge_id));
    }

    let id_str = encode_uuid(merge_id);
    let source = encode_uuid(merge.source_person_id);
    let target = encode_uuid(merge.target_person_id);
    let marker = merge_marker(merge.target_person_id);
    let resolved_by = resolved_by.to_owned();
    let now = encode_ts(Utc::now());

    let done = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !SqliteStore::merge_person_rows(&tx, &source, &target, &marker, now)? {
          // Source vanished or was merged under us; roll back.
          return Ok(false);
        }

        let n = tx.execute(
          "UPDATE merge_events
           SET status = 'executed', resolved_at = ?2, resolved_by = ?3
           WHERE merge_id = ?1 AND status = 'pending'",
          rusqlite::params![id_str, now, resolved_by],
        )?;
        if n == 0 {
          return Ok(false);
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !done {
      return Err(Error::MergeAlreadyResolved(merge_id));
    }
    Ok(())
  }

  async fn merge_persons(&self, source: Uuid, target: Uuid) -> Result<()> {
    let source_str = encode_uuid(source);
    let target_str = encode_uuid(target);
    let marker = merge_marker(target);
    let now = encode_ts(Utc::now());

    let done = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !SqliteStore::merge_person_rows(&tx, &source_str, &target_str, &marker, now)? {
          return Ok(false);
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !done {
      return Err(Error::PersonNotFound(source));
    }
    Ok(())
  }

  // ── Unattributed facts & candidate mentions ───────────────────────────────

  async fn insert_unattributed(
    &self,
    input: NewUnattributedFact,
  ) -> Result<bool> {
    let id = encode_uuid(Uuid::new_v4());
    let shared_by = input.shared_by_person_id.map(encode_uuid);
    let attributions = encode_string_vec(&input.possible_attributions)?;
    let now = encode_ts(Utc::now());

    let created = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO unattributed_facts (
             id, fact_type, fact_value, shared_by_person_id,
             source_segment_id, context, possible_attributions, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id,
            input.fact_type,
            input.fact_value,
            shared_by,
            input.source_segment_id,
            input.context,
            attributions,
            now,
          ],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(created)
  }

  async fn insert_candidate_mention(
    &self,
    input: NewCandidateMention,
  ) -> Result<CandidateMention> {
    let id = Uuid::new_v4();
    let id_str = encode_uuid(id);
    let known_facts = serde_json::to_string(&input.known_facts)?;
    let now = encode_ts(Utc::now());
    let reference = input.reference.clone();
    let source_segment_id = input.source_segment_id.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO candidate_mentions
             (id, reference, known_facts, source_segment_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            id_str,
            reference,
            known_facts,
            source_segment_id,
            now,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(CandidateMention {
      id,
      reference: input.reference,
      known_facts: input.known_facts,
      source_segment_id: input.source_segment_id,
      created_at: crate::encode::decode_ts(now)?,
    })
  }

  async fn list_candidate_mentions(&self) -> Result<Vec<CandidateMention>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, reference, known_facts, source_segment_id, created_at
           FROM candidate_mentions ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map([], mention_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(crate::encode::RawMention::into_mention)
      .collect()
  }

  // ── Suggestions ───────────────────────────────────────────────────────────

  async fn insert_suggestion(
    &self,
    input: NewSuggestion,
  ) -> Result<MergeSuggestion> {
    let suggestion_id = Uuid::new_v4();
    let id_str = encode_uuid(suggestion_id);
    let p1 = encode_uuid(input.person1_id);
    let p2 = encode_uuid(input.person2_id);
    let evidence = serde_json::to_string(&input.evidence)?;
    let now = encode_ts(Utc::now());
    let evidence_type = input.evidence_type;
    let confidence = input.confidence;
    let c1 = input.person1_event_count;
    let c2 = input.person2_event_count;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO merge_suggestions (
             suggestion_id, person1_id, person2_id, evidence_type, evidence,
             confidence, person1_event_count, person2_event_count, status,
             created_at, reviewed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', ?9, NULL)",
          rusqlite::params![
            id_str,
            p1,
            p2,
            evidence_type.as_str(),
            evidence,
            confidence,
            c1,
            c2,
            now,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(MergeSuggestion {
      suggestion_id,
      person1_id: input.person1_id,
      person2_id: input.person2_id,
      evidence_type: input.evidence_type,
      evidence: input.evidence,
      confidence: input.confidence,
      person1_event_count: input.person1_event_count,
      person2_event_count: input.person2_event_count,
      status: SuggestionStatus::Pending,
      created_at: crate::encode::decode_ts(now)?,
      reviewed_at: None,
    })
  }

  async fn get_suggestion(
    &self,
    suggestion_id: Uuid,
  ) -> Result<Option<MergeSuggestion>> {
    let id_str = encode_uuid(suggestion_id);

    let raw = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SUGGESTION_COLS} FROM merge_suggestions
           WHERE suggestion_id = ?1"
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], suggestion_from_row)
            .optional()?,
        )
      })
      .await?;

    raw
      .map(crate::encode::RawSuggestion::into_suggestion)
      .transpose()
  }

  async fn list_suggestions(
    &self,
    status: Option<SuggestionStatus>,
  ) -> Result<Vec<MergeSuggestion>> {
    let status_str = status.map(|s| s.as_str().to_owned());

    let raws = self
      .conn
      .call(move |conn| {
        let rows = if let Some(status) = status_str {
          let sql = format!(
            "SELECT {SUGGESTION_COLS} FROM merge_suggestions
             WHERE status = ?1 ORDER BY confidence DESC, created_at"
          );
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params![status], suggestion_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let sql = format!(
            "SELECT {SUGGESTION_COLS} FROM merge_suggestions
             ORDER BY confidence DESC, created_at"
          );
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map([], suggestion_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(crate::encode::RawSuggestion::into_suggestion)
      .collect()
  }

  async fn pending_suggestion_pairs(&self) -> Result<Vec<PersonPair>> {
    let rows: Vec<(String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT person1_id, person2_id FROM merge_suggestions
           WHERE status = 'pending'",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(a, b)| Ok(PersonPair::new(decode_uuid(&a)?, decode_uuid(&b)?)))
      .collect()
  }

  async fn set_suggestion_status(
    &self,
    suggestion_id: Uuid,
    status:        SuggestionStatus,
  ) -> Result<()> {
    let id_str = encode_uuid(suggestion_id);
    let now = encode_ts(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE merge_suggestions SET status = ?2, reviewed_at = ?3
           WHERE suggestion_id = ?1",
          rusqlite::params![id_str, status.as_str(), now],
        )?;
        Ok(n)
      })
      .await?;

    if changed == 0 {
      return Err(Error::SuggestionNotFound(suggestion_id));
    }
    Ok(())
  }

  // ── Stats ─────────────────────────────────────────────────────────────────

  async fn resolution_stats(&self) -> Result<ResolutionStats> {
    let stats = self
      .conn
      .call(|conn| {
        let scalar = |sql: &str| -> rusqlite::Result<i64> {
          conn.query_row(sql, [], |row| row.get(0))
        };

        let stats = ResolutionStats {
          active_persons: scalar(
            "SELECT COUNT(*) FROM persons WHERE merged_into IS NULL",
          )?,
          merged_persons: scalar(
            "SELECT COUNT(*) FROM persons WHERE merged_into IS NOT NULL",
          )?,
          total_facts: scalar("SELECT COUNT(*) FROM person_facts")?,
          hard_identifiers: scalar(
            "SELECT COUNT(*) FROM person_facts WHERE is_hard_identifier = 1",
          )?,
          pending_merges: scalar(
            "SELECT COUNT(*) FROM merge_events WHERE status = 'pending'",
          )?,
          auto_eligible_merges: scalar(
            "SELECT COUNT(*) FROM merge_events
             WHERE status = 'pending' AND auto_eligible = 1",
          )?,
          unresolved_facts: scalar(
            "SELECT COUNT(*) FROM unattributed_facts",
          )?,
          cross_channel_linked: scalar(
            "SELECT COUNT(*) FROM (
               SELECT person_id FROM person_facts
               WHERE source_channel IS NOT NULL
               GROUP BY person_id
               HAVING COUNT(DISTINCT source_channel) >= 2
             )",
          )?,
        };
        Ok(stats)
      })
      .await?;

    Ok(stats)
  }
}

// ─── Collision folding ───────────────────────────────────────────────────────

fn triggering(
  fact_type: &str,
  fact_value: String,
) -> meld_core::merge::TriggeringFact {
  meld_core::merge::TriggeringFact {
    fact_type: fact_type.to_owned(),
    fact_value,
  }
}

/// Fold (type, value, person, confidence) rows — already sorted by
/// (type, value, person) — into collision groups with ≥ 2 distinct persons.
/// Linear in the number of fact rows.
fn fold_collisions(
  rows: Vec<(String, String, String, f64)>,
) -> Result<Vec<FactCollision>> {
  fn flush(
    group: Option<FactCollision>,
    sum:   f64,
    n:     usize,
    out:   &mut Vec<FactCollision>,
  ) {
    if let Some(mut g) = group
      && g.person_ids.len() >= 2
    {
      g.avg_confidence = if n > 0 { sum / n as f64 } else { 0.0 };
      out.push(g);
    }
  }

  let mut collisions = Vec::new();
  let mut current: Option<FactCollision> = None;
  let mut conf_sum = 0.0;
  let mut conf_n = 0usize;

  for (fact_type, fact_value, person, confidence) in rows {
    let person = decode_uuid(&person)?;

    let same_group = current
      .as_ref()
      .is_some_and(|g| g.fact_type == fact_type && g.fact_value == fact_value);

    if !same_group {
      flush(current.take(), conf_sum, conf_n, &mut collisions);
      current = Some(FactCollision {
        fact_type,
        fact_value,
        person_ids: Vec::new(),
        avg_confidence: 0.0,
      });
      conf_sum = 0.0;
      conf_n = 0;
    }

    if let Some(group) = current.as_mut() {
      // The same person may hold the value under two categories; count once.
      if group.person_ids.last() != Some(&person) {
        group.person_ids.push(person);
      }
    }
    conf_sum += confidence;
    conf_n += 1;
  }

  flush(current.take(), conf_sum, conf_n, &mut collisions);
  Ok(collisions)
}
