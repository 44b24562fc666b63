//! Entity span validation.
//!
//! Detector output is checked against the text before anything is rewritten.
//! The policy is to drop, never to repair: a span that fails any check is
//! discarded with a warning and reported as a [`SpanIssue`], and the remaining
//! spans are processed as usual.
//!
//! Checks, in order:
//!
//! 1. **Shape**: `start` and `end` are integers, the category is a
//!    non-empty string (raw JSON entries only).
//! 2. **Sign**: neither offset is negative.
//! 3. **Order**: `start < end`.
//! 4. **Bounds**: `end <= len(text)` in the detector's offset unit.
//! 5. **Boundary**: both offsets map to UTF-8 char boundaries.
//!
//! Overlapping spans pass validation unless the caller asks for
//! [`drop_overlapping`].

use crate::span::{EntitySpan, OffsetIndex, OffsetUnit, RawSpan};
use serde_json::Value;
use thiserror::Error;

/// Why a span was dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpanIssue {
    #[error("entity #{index}: missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("entity #{index}: field '{field}' is malformed: {found}")]
    MalformedField {
        index: usize,
        field: &'static str,
        found: String,
    },

    #[error("entity #{index}: negative offset in [{start}, {end})")]
    NegativeOffset { index: usize, start: i64, end: i64 },

    #[error("entity #{index}: start >= end in [{start}, {end})")]
    InvertedRange { index: usize, start: i64, end: i64 },

    #[error("entity #{index}: range [{start}, {end}) exceeds text length {len}")]
    OutOfBounds {
        index: usize,
        start: i64,
        end: i64,
        len: usize,
    },

    #[error("entity #{index}: offset {offset} does not fall on a character boundary")]
    NotCharBoundary { index: usize, offset: i64 },

    #[error("entity #{index}: overlaps entity #{other}")]
    Overlapping { index: usize, other: usize },
}

impl SpanIssue {
    /// Position of the offending entry in the caller's input.
    pub fn index(&self) -> usize {
        match self {
            SpanIssue::MissingField { index, .. }
            | SpanIssue::MalformedField { index, .. }
            | SpanIssue::NegativeOffset { index, .. }
            | SpanIssue::InvertedRange { index, .. }
            | SpanIssue::OutOfBounds { index, .. }
            | SpanIssue::NotCharBoundary { index, .. }
            | SpanIssue::Overlapping { index, .. } => *index,
        }
    }
}

/// Spans that passed validation, plus the diagnostics for those that did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedSpans {
    /// Valid spans in byte offsets, in input order
    pub spans: Vec<EntitySpan>,
    /// One entry per dropped span
    pub issues: Vec<SpanIssue>,
    /// Input index of each kept span, parallel to `spans`
    origins: Vec<usize>,
}

impl ValidatedSpans {
    fn keep(&mut self, index: usize, span: EntitySpan) {
        self.spans.push(span);
        self.origins.push(index);
    }

    fn drop_span(&mut self, issue: SpanIssue) {
        tracing::warn!(%issue, "dropping entity span");
        self.issues.push(issue);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Keep only the spans matching `keep`. Removed spans are not issues.
    pub fn retain(&mut self, mut keep: impl FnMut(&EntitySpan) -> bool) {
        let spans = std::mem::take(&mut self.spans);
        let origins = std::mem::take(&mut self.origins);
        for (span, origin) in spans.into_iter().zip(origins) {
            if keep(&span) {
                self.keep(origin, span);
            }
        }
    }
}

/// Validate typed spans against `text`.
pub fn validate_spans(text: &str, spans: &[RawSpan], unit: OffsetUnit) -> ValidatedSpans {
    let index = OffsetIndex::new(text, unit);
    let mut validated = ValidatedSpans::default();

    for (i, raw) in spans.iter().enumerate() {
        if raw.category.trim().is_empty() {
            validated.drop_span(SpanIssue::MissingField {
                index: i,
                field: "category",
            });
            continue;
        }
        match check_bounds(i, raw.start, raw.end, &index) {
            Ok((start, end)) => validated.keep(i, EntitySpan::new(start, end, &raw.category)),
            Err(issue) => validated.drop_span(issue),
        }
    }

    validated
}

/// Validate loosely typed detector entries against `text`.
///
/// Each entry must be a JSON object with integer `start` and `end` fields. The
/// category is read from `category`, then Hugging Face's `entity_group`, then
/// the per-token `entity` label with its `B-`/`I-` prefix removed.
pub fn validate_raw(text: &str, entries: &[Value], unit: OffsetUnit) -> ValidatedSpans {
    let index = OffsetIndex::new(text, unit);
    let mut validated = ValidatedSpans::default();

    for (i, entry) in entries.iter().enumerate() {
        let raw = match parse_entry(i, entry) {
            Ok(raw) => raw,
            Err(issue) => {
                validated.drop_span(issue);
                continue;
            }
        };
        match check_bounds(i, raw.start, raw.end, &index) {
            Ok((start, end)) => validated.keep(i, EntitySpan::new(start, end, raw.category)),
            Err(issue) => validated.drop_span(issue),
        }
    }

    validated
}

/// Pairs of input indices whose spans overlap.
pub fn find_overlaps(spans: &[EntitySpan]) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by_key(|&i| spans[i].start);

    let mut pairs = Vec::new();
    for (pos, &i) in order.iter().enumerate() {
        for &j in &order[pos + 1..] {
            if spans[j].start >= spans[i].end {
                break;
            }
            pairs.push((i.min(j), i.max(j)));
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Keep only the first span, in document order, of each overlapping cluster.
///
/// Dropped spans are reported as [`SpanIssue::Overlapping`] against the span
/// that was kept.
pub fn drop_overlapping(validated: ValidatedSpans) -> ValidatedSpans {
    let ValidatedSpans {
        spans,
        mut issues,
        origins,
    } = validated;

    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by_key(|&i| spans[i].start);

    let mut keep = vec![false; spans.len()];
    // (kept position, end of the current cluster)
    let mut cluster: Option<(usize, usize)> = None;
    for &i in &order {
        match cluster {
            Some((kept, cluster_end)) if spans[i].start < cluster_end => {
                let issue = SpanIssue::Overlapping {
                    index: origins[i],
                    other: origins[kept],
                };
                tracing::warn!(%issue, "dropping entity span");
                issues.push(issue);
                cluster = Some((kept, cluster_end.max(spans[i].end)));
            }
            _ => {
                keep[i] = true;
                cluster = Some((i, spans[i].end));
            }
        }
    }

    let mut result = ValidatedSpans {
        spans: Vec::new(),
        issues,
        origins: Vec::new(),
    };
    for (i, span) in spans.into_iter().enumerate() {
        if keep[i] {
            result.keep(origins[i], span);
        }
    }
    result
}

fn parse_entry(index: usize, entry: &Value) -> Result<RawSpan, SpanIssue> {
    if !entry.is_object() {
        return Err(SpanIssue::MalformedField {
            index,
            field: "entity",
            found: entry.to_string(),
        });
    }

    let start = offset_field(index, entry, "start")?;
    let end = offset_field(index, entry, "end")?;
    let category = category_field(index, entry)?;

    Ok(RawSpan {
        start,
        end,
        category,
    })
}

fn offset_field(index: usize, entry: &Value, field: &'static str) -> Result<i64, SpanIssue> {
    let value = match entry.get(field) {
        None | Some(Value::Null) => return Err(SpanIssue::MissingField { index, field }),
        Some(value) => value,
    };

    value
        .as_i64()
        .or_else(|| {
            // Integral floats (`5.0`) are accepted; JSON emitters disagree on them.
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .ok_or_else(|| SpanIssue::MalformedField {
            index,
            field,
            found: value.to_string(),
        })
}

fn category_field(index: usize, entry: &Value) -> Result<String, SpanIssue> {
    let (field, value) = ["category", "entity_group", "entity"]
        .into_iter()
        .find_map(|field| match entry.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => Some((field, value)),
        })
        .ok_or(SpanIssue::MissingField {
            index,
            field: "category",
        })?;

    let label = value.as_str().ok_or_else(|| SpanIssue::MalformedField {
        index,
        field: "category",
        found: value.to_string(),
    })?;

    let label = if field == "entity" {
        label
            .strip_prefix("B-")
            .or_else(|| label.strip_prefix("I-"))
            .unwrap_or(label)
    } else {
        label
    };

    if label.trim().is_empty() {
        return Err(SpanIssue::MalformedField {
            index,
            field: "category",
            found: value.to_string(),
        });
    }

    Ok(label.to_string())
}

fn check_bounds(
    index: usize,
    start: i64,
    end: i64,
    offsets: &OffsetIndex<'_>,
) -> Result<(usize, usize), SpanIssue> {
    if start < 0 || end < 0 {
        return Err(SpanIssue::NegativeOffset { index, start, end });
    }
    if start >= end {
        return Err(SpanIssue::InvertedRange { index, start, end });
    }

    let len = offsets.len();
    // Non-negative from here on.
    let (ustart, uend) = (
        usize::try_from(start).unwrap_or(usize::MAX),
        usize::try_from(end).unwrap_or(usize::MAX),
    );
    if uend > len {
        return Err(SpanIssue::OutOfBounds {
            index,
            start,
            end,
            len,
        });
    }

    let byte_start = offsets
        .to_byte(ustart)
        .ok_or(SpanIssue::NotCharBoundary {
            index,
            offset: start,
        })?;
    let byte_end = offsets
        .to_byte(uend)
        .ok_or(SpanIssue::NotCharBoundary { index, offset: end })?;

    Ok((byte_start, byte_end))
}
