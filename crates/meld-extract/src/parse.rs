//! Parsing of analyzer output: a single JSON document or an array of them.

use serde_json::Value;

use crate::{Error, Result, SegmentExtraction};

/// Parse one analyzer run. Both a single object and an array of objects are
/// accepted; anything else is rejected.
pub fn parse_documents(input: &str) -> Result<Vec<SegmentExtraction>> {
  let value: Value = serde_json::from_str(input)?;
  match value {
    Value::Array(items) => items
      .into_iter()
      .map(|item| Ok(serde_json::from_value(item)?))
      .collect(),
    obj @ Value::Object(_) => Ok(vec![serde_json::from_value(obj)?]),
    other => Err(Error::UnexpectedShape(format!(
      "expected object or array, got {}",
      type_name(&other)
    ))),
  }
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ConfidenceTier, SubjectKind};

  const DOC: &str = r#"{
    "segment_id": "seg-42",
    "extraction_metadata": {
      "channel": "imessage",
      "primary_contact_name": "Dana Hu",
      "primary_contact_identifier": "+1 512 555 0100"
    },
    "facts": [
      {
        "subject_kind": "primary_contact",
        "subject_ref": "Dana",
        "category": "professional",
        "fact_type": "employer_current",
        "value": "Initech",
        "confidence": "high",
        "evidence": "I just started at Initech",
        "self_disclosed": true,
        "source": "message"
      },
      {
        "subject_kind": "third_party",
        "subject_ref": "Bob",
        "category": "contact_information",
        "fact_type": "email_personal",
        "value": "bob@x.com",
        "confidence": "medium"
      }
    ],
    "unattributed_facts": [
      {
        "fact_type": "location_current",
        "fact_value": "Berlin",
        "shared_by": "Dana",
        "context": "someone moved to Berlin",
        "possible_attributions": ["Bob", "Kate"]
      }
    ]
  }"#;

  #[test]
  fn parses_single_object() {
    let docs = parse_documents(DOC).unwrap();
    assert_eq!(docs.len(), 1);

    let doc = &docs[0];
    assert_eq!(doc.segment_id, "seg-42");
    assert_eq!(doc.extraction_metadata.channel.as_deref(), Some("imessage"));
    assert_eq!(doc.facts.len(), 2);
    assert_eq!(doc.facts[0].subject_kind, SubjectKind::PrimaryContact);
    assert_eq!(doc.facts[0].confidence, ConfidenceTier::High);
    assert!(doc.facts[0].self_disclosed);
    assert_eq!(doc.facts[1].subject_kind, SubjectKind::ThirdParty);
    assert_eq!(doc.unattributed_facts.len(), 1);
    assert_eq!(
      doc.unattributed_facts[0].possible_attributions,
      vec!["Bob".to_owned(), "Kate".to_owned()]
    );
  }

  #[test]
  fn parses_array_of_objects() {
    let input = format!("[{DOC}, {DOC}]");
    let docs = parse_documents(&input).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].segment_id, "seg-42");
  }

  #[test]
  fn unknown_subject_kind_falls_back_to_other() {
    let input = r#"{
      "segment_id": "seg-1",
      "facts": [{
        "subject_kind": "narrator",
        "category": "personal",
        "fact_type": "hobby",
        "value": "chess"
      }]
    }"#;
    let docs = parse_documents(input).unwrap();
    assert_eq!(docs[0].facts[0].subject_kind, SubjectKind::Other);
    assert_eq!(docs[0].facts[0].confidence, ConfidenceTier::Unspecified);
  }

  #[test]
  fn missing_metadata_defaults_empty() {
    let docs = parse_documents(r#"{"segment_id": "seg-9"}"#).unwrap();
    assert!(docs[0].extraction_metadata.channel.is_none());
    assert!(docs[0].facts.is_empty());
    assert!(docs[0].unattributed_facts.is_empty());
  }

  #[test]
  fn scalar_input_is_rejected() {
    assert!(matches!(
      parse_documents("42"),
      Err(Error::UnexpectedShape(_))
    ));
  }

  #[test]
  fn confidence_tier_mapping() {
    assert_eq!(ConfidenceTier::High.score(), 0.9);
    assert_eq!(ConfidenceTier::Medium.score(), 0.7);
    assert_eq!(ConfidenceTier::Low.score(), 0.4);
    assert_eq!(ConfidenceTier::Unspecified.score(), 0.5);
  }
}
