//! Events and event participation, as written by channel importers.
//!
//! The engine reads these; it never produces them. Participation is recorded
//! at the contact level — person attribution flows through person-contact
//! links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether the user sent, received, or merely observed an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Sent,
  Received,
  Observed,
}

impl Direction {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Sent => "sent",
      Self::Received => "received",
      Self::Observed => "observed",
    }
  }
}

/// A single normalised communication event from any channel.
/// Unique store-wide by (source_adapter, source_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub event_id:       Uuid,
  pub timestamp:      DateTime<Utc>,
  pub channel:        String,
  pub content_types:  Vec<String>,
  pub content:        String,
  pub direction:      Direction,
  pub thread_id:      Option<String>,
  pub source_adapter: String,
  pub source_id:      String,
}

/// Input to [`crate::store::IdentityStore::insert_event`].
/// `event_id` is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub timestamp:      DateTime<Utc>,
  pub channel:        String,
  pub content_types:  Vec<String>,
  pub content:        String,
  pub direction:      Direction,
  pub thread_id:      Option<String>,
  pub source_adapter: String,
  pub source_id:      String,
}

// ─── Participation ───────────────────────────────────────────────────────────

/// The role a contact played in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
  Sender,
  Recipient,
  Cc,
  Bcc,
  Observer,
}

impl ParticipantRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Sender => "sender",
      Self::Recipient => "recipient",
      Self::Cc => "cc",
      Self::Bcc => "bcc",
      Self::Observer => "observer",
    }
  }
}

/// A contact's participation in one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventParticipant {
  pub event_id:   Uuid,
  pub contact_id: Uuid,
  pub role:       ParticipantRole,
}
