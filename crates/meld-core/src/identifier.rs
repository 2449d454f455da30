//! Canonical forms for channel-scoped identifiers.
//!
//! Normalisation is pure, total over non-empty inputs, and idempotent:
//! `normalize(normalize(x, k), k) == normalize(x, k)`. Inputs that collapse
//! to the empty string are rejected before any registry touch.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The channel type of an identifier attached to a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
  Email,
  Phone,
  Handle,
}

impl IdentifierKind {
  /// The discriminant string stored in the `kind` column.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Email => "email",
      Self::Phone => "phone",
      Self::Handle => "handle",
    }
  }
}

impl std::fmt::Display for IdentifierKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Normalise `raw` for matching under `kind`.
///
/// - email: trim + lowercase
/// - phone: digits only, with one leading `+` preserved
/// - handle: trim + lowercase, leading `@` stripped
pub fn normalize(raw: &str, kind: IdentifierKind) -> Result<String> {
  let normalized = match kind {
    IdentifierKind::Email => raw.trim().to_lowercase(),
    IdentifierKind::Phone => {
      let trimmed = raw.trim();
      let mut out = String::with_capacity(trimmed.len());
      if trimmed.starts_with('+') {
        out.push('+');
      }
      out.extend(trimmed.chars().filter(char::is_ascii_digit));
      // A bare "+" carries no digits.
      if out == "+" { String::new() } else { out }
    }
    IdentifierKind::Handle => {
      raw.trim().trim_start_matches('@').to_lowercase()
    }
  };

  if normalized.is_empty() {
    return Err(Error::InvalidIdentifier { kind, raw: raw.to_owned() });
  }
  Ok(normalized)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_is_trimmed_and_lowercased() {
    assert_eq!(
      normalize("  Alice@Example.COM ", IdentifierKind::Email).unwrap(),
      "alice@example.com"
    );
  }

  #[test]
  fn phone_keeps_digits_and_leading_plus() {
    assert_eq!(
      normalize("+1 (512) 555-0100", IdentifierKind::Phone).unwrap(),
      "+15125550100"
    );
    assert_eq!(
      normalize("512.555.0100", IdentifierKind::Phone).unwrap(),
      "5125550100"
    );
  }

  #[test]
  fn handle_strips_at_and_lowercases() {
    assert_eq!(
      normalize("@AliceW ", IdentifierKind::Handle).unwrap(),
      "alicew"
    );
  }

  #[test]
  fn empty_after_normalization_is_rejected() {
    assert!(normalize("   ", IdentifierKind::Email).is_err());
    assert!(normalize("+", IdentifierKind::Phone).is_err());
    assert!(normalize("ext. abc", IdentifierKind::Email).is_ok());
    assert!(normalize("abc", IdentifierKind::Phone).is_err());
  }

  #[test]
  fn normalization_is_idempotent() {
    for (raw, kind) in [
      (" Bob@X.io", IdentifierKind::Email),
      ("+44 20 7946 0958", IdentifierKind::Phone),
      ("@Bob_42", IdentifierKind::Handle),
    ] {
      let once = normalize(raw, kind).unwrap();
      let twice = normalize(&once, kind).unwrap();
      assert_eq!(once, twice);
    }
  }
}
