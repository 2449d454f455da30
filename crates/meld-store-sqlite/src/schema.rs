//! SQL schema for the Meld SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The PRAGMAs establish the single-writer profile: write-ahead logging,
/// normal-synchronous durability, referential integrity, and a 30-second
/// busy timeout for readers queuing behind the writer.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 30000;

-- Normalised communication events, written by channel importers.
CREATE TABLE IF NOT EXISTS events (
    event_id       TEXT PRIMARY KEY,
    timestamp      INTEGER NOT NULL,        -- Unix seconds
    channel        TEXT NOT NULL,
    content_types  TEXT NOT NULL DEFAULT '[]',
    content        TEXT NOT NULL,
    direction      TEXT NOT NULL,           -- 'sent' | 'received' | 'observed'
    thread_id      TEXT,
    source_adapter TEXT NOT NULL,
    source_id      TEXT NOT NULL,
    UNIQUE (source_adapter, source_id)
);

-- Contacts are created on first sight of an identifier and never deleted.
CREATE TABLE IF NOT EXISTS contacts (
    contact_id   TEXT PRIMARY KEY,
    display_name TEXT,
    source       TEXT NOT NULL,
    created_at   INTEGER NOT NULL,
    updated_at   INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS contact_identifiers (
    contact_id TEXT NOT NULL REFERENCES contacts(contact_id),
    kind       TEXT NOT NULL,               -- 'email' | 'phone' | 'handle'
    value      TEXT NOT NULL,
    normalized TEXT NOT NULL,
    UNIQUE (kind, normalized)
);

CREATE TABLE IF NOT EXISTS persons (
    person_id         TEXT PRIMARY KEY,
    canonical_name    TEXT NOT NULL,
    display_name      TEXT,
    is_me             INTEGER NOT NULL DEFAULT 0,
    relationship_type TEXT,
    merged_into       TEXT REFERENCES persons(person_id),
    created_at        INTEGER NOT NULL,
    updated_at        INTEGER NOT NULL
);

-- Exactly zero or one person is the user.
CREATE UNIQUE INDEX IF NOT EXISTS persons_me_idx
    ON persons(is_me) WHERE is_me = 1;

CREATE TABLE IF NOT EXISTS person_contact_links (
    person_id  TEXT NOT NULL REFERENCES persons(person_id),
    contact_id TEXT NOT NULL REFERENCES contacts(contact_id),
    source     TEXT NOT NULL,
    confidence REAL NOT NULL,
    PRIMARY KEY (person_id, contact_id)
);

-- Participation is recorded at the contact level; person attribution flows
-- through person_contact_links.
CREATE TABLE IF NOT EXISTS event_participants (
    event_id   TEXT NOT NULL REFERENCES events(event_id),
    contact_id TEXT NOT NULL REFERENCES contacts(contact_id),
    role       TEXT NOT NULL,
    PRIMARY KEY (event_id, contact_id, role)
);

-- Segment membership, written by the external chunker.
CREATE TABLE IF NOT EXISTS segment_events (
    segment_id TEXT NOT NULL,
    event_id   TEXT NOT NULL REFERENCES events(event_id),
    PRIMARY KEY (segment_id, event_id)
);

CREATE TABLE IF NOT EXISTS person_facts (
    fact_id            TEXT PRIMARY KEY,
    person_id          TEXT NOT NULL REFERENCES persons(person_id),
    category           TEXT NOT NULL,
    fact_type          TEXT NOT NULL,
    fact_value         TEXT NOT NULL,
    confidence         REAL NOT NULL,
    source_type        TEXT NOT NULL,
    source_channel     TEXT,
    source_segment     TEXT,
    source_facet_id    TEXT,
    evidence           TEXT,
    is_sensitive       INTEGER NOT NULL DEFAULT 0,
    is_identifier      INTEGER NOT NULL DEFAULT 0,
    is_hard_identifier INTEGER NOT NULL DEFAULT 0,
    created_at         INTEGER NOT NULL,
    updated_at         INTEGER NOT NULL,
    UNIQUE (person_id, category, fact_type, fact_value)
);

CREATE TABLE IF NOT EXISTS unattributed_facts (
    id                    TEXT PRIMARY KEY,
    fact_type             TEXT NOT NULL,
    fact_value            TEXT NOT NULL,
    shared_by_person_id   TEXT REFERENCES persons(person_id),
    source_segment_id     TEXT NOT NULL,
    context               TEXT NOT NULL,
    possible_attributions TEXT NOT NULL DEFAULT '[]',
    created_at            INTEGER NOT NULL,
    UNIQUE (fact_type, fact_value, source_segment_id)
);

CREATE TABLE IF NOT EXISTS candidate_mentions (
    id                TEXT PRIMARY KEY,
    reference         TEXT NOT NULL,
    known_facts       TEXT NOT NULL DEFAULT '{}',
    source_segment_id TEXT NOT NULL,
    created_at        INTEGER NOT NULL
);

-- One merge event per unordered person pair, keyed on (min, max).
CREATE TABLE IF NOT EXISTS merge_events (
    merge_id         TEXT PRIMARY KEY,
    source_person_id TEXT NOT NULL REFERENCES persons(person_id),
    target_person_id TEXT NOT NULL REFERENCES persons(person_id),
    pair_lo          TEXT NOT NULL,
    pair_hi          TEXT NOT NULL,
    merge_type       TEXT NOT NULL,
    triggering_facts TEXT NOT NULL DEFAULT '[]',
    similarity_score REAL NOT NULL,
    status           TEXT NOT NULL DEFAULT 'pending',
    auto_eligible    INTEGER NOT NULL DEFAULT 0,
    created_at       INTEGER NOT NULL,
    resolved_at      INTEGER,
    resolved_by      TEXT,
    UNIQUE (pair_lo, pair_hi)
);

-- The heuristic proposal stream; independent of merge_events.
CREATE TABLE IF NOT EXISTS merge_suggestions (
    suggestion_id       TEXT PRIMARY KEY,
    person1_id          TEXT NOT NULL REFERENCES persons(person_id),
    person2_id          TEXT NOT NULL REFERENCES persons(person_id),
    evidence_type       TEXT NOT NULL,
    evidence            TEXT NOT NULL DEFAULT '{}',
    confidence          REAL NOT NULL,
    person1_event_count INTEGER NOT NULL DEFAULT 0,
    person2_event_count INTEGER NOT NULL DEFAULT 0,
    status              TEXT NOT NULL DEFAULT 'pending',
    created_at          INTEGER NOT NULL,
    reviewed_at         INTEGER
);

CREATE INDEX IF NOT EXISTS facts_person_idx
    ON person_facts(person_id);
CREATE INDEX IF NOT EXISTS facts_type_value_idx
    ON person_facts(fact_type, fact_value);
CREATE INDEX IF NOT EXISTS facts_hard_idx
    ON person_facts(fact_type, fact_value) WHERE is_hard_identifier = 1;
CREATE INDEX IF NOT EXISTS contact_identifiers_contact_idx
    ON contact_identifiers(contact_id);
CREATE INDEX IF NOT EXISTS links_contact_idx
    ON person_contact_links(contact_id);
CREATE INDEX IF NOT EXISTS participants_contact_idx
    ON event_participants(contact_id);
CREATE INDEX IF NOT EXISTS merge_events_status_idx
    ON merge_events(status);
CREATE INDEX IF NOT EXISTS suggestions_status_idx
    ON merge_suggestions(status);

PRAGMA user_version = 1;
";
