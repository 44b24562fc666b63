//! Integration tests for the copy → redact → paste → restore workflow
//!
//! The host redacts clipboard text through a detector, then rebuilds the
//! mapping from the two text versions, and later restores whatever redacted
//! text comes back.

use redact_engine::{
    Detection, DetectionError, EngineConfig, OffsetUnit, RedactError, RedactionStatus,
    SharedSession,
};
use serde_json::{json, Value};

/// Fake NER service: tags every known name, Hugging Face style, char offsets.
fn ner(text: &str) -> Detection {
    let known = [("Alice", "PER"), ("Bob", "PER"), ("Berlin", "LOC"), ("Initech", "ORG")];
    let mut entities: Vec<Value> = Vec::new();
    for (word, group) in known {
        for (byte, _) in text.match_indices(word) {
            let start = text[..byte].chars().count();
            entities.push(json!({
                "entity_group": group,
                "score": 0.97,
                "word": word,
                "start": start,
                "end": start + word.chars().count(),
            }));
        }
    }
    Ok(entities)
}

fn offline(_text: &str) -> Detection {
    Err(DetectionError::Unavailable("503 Service Unavailable".into()))
}

fn session() -> SharedSession {
    SharedSession::new(EngineConfig {
        offset_unit: OffsetUnit::Char,
        ..EngineConfig::default()
    })
}

#[test]
fn test_redact_remember_restore() {
    let session = session();
    let original = "Grüße from Alice at Initech, Berlin.";

    let redaction = session.redact_with(&ner, original).unwrap();
    assert_eq!(redaction.text, "Grüße from [PER] at [ORG], [LOC].");

    // Host rebuilds the mapping from what it put on the clipboard.
    let mapping = session.remember(&redaction.text, original);
    assert_eq!(mapping, redaction.mapping);

    assert_eq!(session.restore(&redaction.text), original);
    assert_eq!(session.decode_word("[ORG]"), "Initech");
}

#[test]
fn test_restore_edited_redacted_text() {
    let session = session();
    let redaction = session
        .redact_with(&ner, "Alice works in Berlin")
        .unwrap();
    assert_eq!(redaction.text, "[PER] works in [LOC]");

    // The redacted text was rewritten elsewhere before coming back.
    let reply = "Thanks! [PER] can move from [LOC] next month. [DATE] TBD.";
    assert_eq!(
        session.restore(reply),
        "Thanks! Alice can move from Berlin next month. [DATE] TBD."
    );
}

#[test]
fn test_same_category_collision_is_last_write_wins() {
    let session = session();
    let redaction = session.redact_with(&ner, "Alice met Bob").unwrap();
    assert_eq!(redaction.text, "[PER] met [PER]");
    assert_eq!(redaction.mapping.len(), 1);
    assert_eq!(session.restore(&redaction.text), "Bob met Bob");
}

#[test]
fn test_detector_outage_fails_open_and_keeps_mapping() {
    let session = session();
    session.redact_with(&ner, "Alice was here").unwrap();

    let err = session.redact_with(&offline, "Bob was here").unwrap_err();
    match &err {
        RedactError::DetectionUnavailable { source, .. } => {
            assert!(matches!(source, DetectionError::Unavailable(_)));
        }
    }
    assert_eq!(err.into_fallback_text(), "Bob was here");

    // The earlier mapping is still usable.
    assert_eq!(session.restore("[PER] was here"), "Alice was here");
}

#[test]
fn test_empty_clipboard_is_noop() {
    let session = session();
    let redaction = session.redact_with(&offline, "").unwrap();
    assert_eq!(redaction.status, RedactionStatus::EmptyInput);
    assert_eq!(redaction.text, "");
}

#[test]
fn test_plain_text_without_entities() {
    let session = session();
    let text = "nothing sensitive here";
    let redaction = session.redact_with(&ner, text).unwrap();
    assert_eq!(redaction.text, text);
    assert!(redaction.mapping.is_empty());
    assert_eq!(session.restore(text), text);
}
