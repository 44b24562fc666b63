//! Redaction sessions.
//!
//! A session owns the mapping produced by the most recent redaction so that a
//! later restore can undo it. Each redaction replaces the previous mapping;
//! restores only read it.
//!
//! [`RedactionSession`] is a plain value owned by the caller. Hosts that need
//! one process-wide slot shared across threads use [`SharedSession`], which
//! serializes every call behind a mutex.

use crate::align::build_mapping_with;
use crate::config::EngineConfig;
use crate::decode::{decode_report, decode_word, Decoded};
use crate::detector::EntityDetector;
use crate::edit::apply;
use crate::error::RedactError;
use crate::mapping::Mapping;
use crate::span::{EntitySpan, RawSpan};
use crate::validate::{drop_overlapping, validate_raw, validate_spans, SpanIssue, ValidatedSpans};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// What a redaction call did with its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactionStatus {
    /// Spans were validated and applied (possibly none)
    Redacted,
    /// Input was empty or whitespace-only; returned unchanged
    EmptyInput,
    /// Input exceeded `max_input_chars`; returned unchanged. `len` is in
    /// the configured offset unit.
    TooLong { len: usize, limit: usize },
}

/// Result of one redaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    /// Redacted text, or the input itself for a no-op
    pub text: String,
    /// Mapping to restore `text`
    pub mapping: Mapping,
    /// Spans that were applied, in byte offsets
    pub spans: Vec<EntitySpan>,
    /// Spans that were dropped and why
    pub issues: Vec<SpanIssue>,
    pub status: RedactionStatus,
}

impl Redaction {
    fn unchanged(text: &str, status: RedactionStatus) -> Self {
        Self {
            text: text.to_string(),
            mapping: Mapping::new(),
            spans: Vec::new(),
            issues: Vec::new(),
            status,
        }
    }

    pub fn is_redacted(&self) -> bool {
        self.status == RedactionStatus::Redacted
    }
}

#[derive(Debug, Clone, Default)]
pub struct RedactionSession {
    config: EngineConfig,
    mapping: Mapping,
}

impl RedactionSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            mapping: Mapping::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mapping from the most recent redaction.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Redact `text` using caller-supplied spans.
    pub fn redact_spans(&mut self, text: &str, spans: &[RawSpan]) -> Redaction {
        if let Some(status) = self.skip_reason(text) {
            return Redaction::unchanged(text, status);
        }
        let validated = validate_spans(text, spans, self.config.offset_unit);
        self.finish(text, validated)
    }

    /// Redact `text` using raw detector entries (JSON objects).
    pub fn redact_entries(&mut self, text: &str, entries: &[Value]) -> Redaction {
        if let Some(status) = self.skip_reason(text) {
            return Redaction::unchanged(text, status);
        }
        let validated = validate_raw(text, entries, self.config.offset_unit);
        self.finish(text, validated)
    }

    /// Run `detector` on `text` and redact what it finds.
    ///
    /// If detection fails the session keeps its previous mapping and the
    /// error carries the original text for the caller to fall back to.
    pub fn redact_with<D>(&mut self, detector: &D, text: &str) -> Result<Redaction, RedactError>
    where
        D: EntityDetector + ?Sized,
    {
        if let Some(status) = self.skip_reason(text) {
            return Ok(Redaction::unchanged(text, status));
        }

        let entries = detector.detect(text).map_err(|source| {
            tracing::warn!(%source, "entity detection failed, text left unredacted");
            RedactError::DetectionUnavailable {
                source,
                original: text.to_string(),
            }
        })?;

        let validated = validate_raw(text, &entries, self.config.offset_unit);
        Ok(self.finish(text, validated))
    }

    /// Rebuild and store the mapping from a redacted/original pair.
    ///
    /// For flows where redaction happened without this session seeing the
    /// spans (e.g. text copied out and back in).
    pub fn remember(&mut self, redacted: &str, original: &str) -> &Mapping {
        self.mapping = build_mapping_with(redacted, original, self.config.collision_policy);
        &self.mapping
    }

    /// Restore redacted text with the stored mapping.
    pub fn restore(&self, redacted: &str) -> String {
        self.restore_report(redacted).text
    }

    pub fn restore_report(&self, redacted: &str) -> Decoded {
        decode_report(redacted, &self.mapping)
    }

    /// Resolve one placeholder token with the stored mapping.
    pub fn decode_word<'a>(&'a self, word: &'a str) -> &'a str {
        decode_word(word, &self.mapping)
    }

    /// Whether `detector` finds any redactable entity in `text`.
    ///
    /// Inputs that redaction would skip, and detector failures, count as no.
    /// Does not touch the stored mapping.
    pub fn contains_entities<D>(&self, detector: &D, text: &str) -> bool
    where
        D: EntityDetector + ?Sized,
    {
        if self.skip_reason(text).is_some() {
            return false;
        }
        match detector.detect(text) {
            Ok(entries) => validate_raw(text, &entries, self.config.offset_unit)
                .spans
                .iter()
                .any(|span| self.config.redacts(&span.category)),
            Err(error) => {
                tracing::warn!(%error, "entity detection failed during check");
                false
            }
        }
    }

    fn skip_reason(&self, text: &str) -> Option<RedactionStatus> {
        if text.trim().is_empty() {
            tracing::debug!("empty input, nothing to redact");
            return Some(RedactionStatus::EmptyInput);
        }
        if let Some(limit) = self.config.max_input_chars {
            let len = self.config.offset_unit.measure(text);
            if len > limit {
                tracing::warn!(len, limit, unit = ?self.config.offset_unit, "input too long, left unredacted");
                return Some(RedactionStatus::TooLong { len, limit });
            }
        }
        None
    }

    fn finish(&mut self, text: &str, mut validated: ValidatedSpans) -> Redaction {
        let config = &self.config;
        validated.retain(|span| {
            let selected = config.redacts(&span.category);
            if !selected {
                tracing::debug!(category = %span.category, "category not selected for redaction");
            }
            selected
        });
        if config.drop_overlapping {
            validated = drop_overlapping(validated);
        }

        let redacted = apply(text, &validated.spans);
        let mapping = Mapping::from_spans(text, &validated.spans, config.collision_policy);
        tracing::debug!(
            spans = validated.spans.len(),
            dropped = validated.issues.len(),
            "redaction applied"
        );

        self.mapping = mapping.clone();
        Redaction {
            text: redacted,
            mapping,
            spans: validated.spans,
            issues: validated.issues,
            status: RedactionStatus::Redacted,
        }
    }
}

/// Thread-safe handle to a single session.
///
/// Every method holds the lock for its whole duration, including the detector
/// call in [`SharedSession::redact_with`], so a restore never observes a
/// half-finished redaction. Use [`SharedSession::with`] to run a
/// redact/restore pair atomically.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<RedactionSession>>,
}

impl SharedSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RedactionSession::new(config))),
        }
    }

    pub fn redact_with<D>(&self, detector: &D, text: &str) -> Result<Redaction, RedactError>
    where
        D: EntityDetector + ?Sized,
    {
        self.inner.lock().redact_with(detector, text)
    }

    pub fn redact_spans(&self, text: &str, spans: &[RawSpan]) -> Redaction {
        self.inner.lock().redact_spans(text, spans)
    }

    pub fn remember(&self, redacted: &str, original: &str) -> Mapping {
        self.inner.lock().remember(redacted, original).clone()
    }

    pub fn restore(&self, redacted: &str) -> String {
        self.inner.lock().restore(redacted)
    }

    pub fn decode_word(&self, word: &str) -> String {
        self.inner.lock().decode_word(word).to_string()
    }

    /// Snapshot of the current mapping.
    pub fn mapping(&self) -> Mapping {
        self.inner.lock().mapping().clone()
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut RedactionSession) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
