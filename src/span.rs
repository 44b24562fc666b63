//! Entity spans, offset units and placeholder tokens.
//!
//! Detectors report offsets in whatever unit their runtime indexes strings
//! by. Everything downstream of the validator works on UTF-8 byte offsets,
//! so [`OffsetIndex`] translates between the two.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[A-Z_]+\]").expect("placeholder pattern is valid"));

/// Pattern matching a placeholder token such as `[PER]` or `[DATE_TIME]`.
pub fn placeholder_pattern() -> &'static Regex {
    &PLACEHOLDER_PATTERN
}

/// Build the placeholder token for an entity category.
///
/// The category is uppercased and wrapped in brackets. Categories that still
/// contain characters outside `A-Z` and `_` after uppercasing yield tokens the
/// decoder will not recognize.
pub fn placeholder(category: &str) -> String {
    format!("[{}]", category.to_uppercase())
}

/// A validated entity occurrence.
///
/// Offsets are byte offsets into the source text, half-open, and always fall
/// on UTF-8 char boundaries once produced by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Starting byte offset (inclusive)
    pub start: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
    /// Category label as reported by the detector (e.g. `per`, `LOC`)
    pub category: String,
}

impl EntitySpan {
    pub fn new(start: usize, end: usize, category: impl Into<String>) -> Self {
        Self {
            start,
            end,
            category: category.into(),
        }
    }

    /// Placeholder token that replaces this span.
    pub fn placeholder(&self) -> String {
        placeholder(&self.category)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &EntitySpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An unchecked span as handed over by a caller, in detector units.
///
/// Offsets are signed so that negative values coming from loosely typed
/// detectors can be reported rather than silently wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpan {
    pub start: i64,
    pub end: i64,
    pub category: String,
}

impl RawSpan {
    pub fn new(start: i64, end: i64, category: impl Into<String>) -> Self {
        Self {
            start,
            end,
            category: category.into(),
        }
    }
}

/// Unit in which a detector measures offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetUnit {
    /// UTF-8 bytes
    #[default]
    Byte,
    /// Unicode scalar values (Python `str` indexing)
    Char,
    /// UTF-16 code units (JavaScript string indexing)
    Utf16,
}

impl OffsetUnit {
    /// Length of `text` counted in this unit.
    pub fn measure(self, text: &str) -> usize {
        match self {
            OffsetUnit::Byte => text.len(),
            OffsetUnit::Char => text.chars().count(),
            OffsetUnit::Utf16 => text.encode_utf16().count(),
        }
    }
}

/// Translates detector offsets into byte offsets for one text.
pub struct OffsetIndex<'a> {
    text: &'a str,
    unit: OffsetUnit,
    /// Byte offset for each unit position, `None` where the position falls
    /// inside a char. Empty for [`OffsetUnit::Byte`].
    table: Vec<Option<usize>>,
}

impl<'a> OffsetIndex<'a> {
    pub fn new(text: &'a str, unit: OffsetUnit) -> Self {
        let table = match unit {
            OffsetUnit::Byte => Vec::new(),
            OffsetUnit::Char => text
                .char_indices()
                .map(|(byte, _)| Some(byte))
                .chain(std::iter::once(Some(text.len())))
                .collect(),
            OffsetUnit::Utf16 => {
                let mut table = Vec::with_capacity(text.len() + 1);
                for (byte, ch) in text.char_indices() {
                    table.push(Some(byte));
                    // Second half of a surrogate pair is not addressable.
                    if ch.len_utf16() == 2 {
                        table.push(None);
                    }
                }
                table.push(Some(text.len()));
                table
            }
        };
        Self { text, unit, table }
    }

    pub fn unit(&self) -> OffsetUnit {
        self.unit
    }

    /// Length of the text in this index's unit.
    pub fn len(&self) -> usize {
        match self.unit {
            OffsetUnit::Byte => self.text.len(),
            _ => self.table.len().saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte offset for a unit offset, or `None` if it is past the end or
    /// does not land on a char boundary.
    pub fn to_byte(&self, offset: usize) -> Option<usize> {
        match self.unit {
            OffsetUnit::Byte => {
                (offset <= self.text.len() && self.text.is_char_boundary(offset)).then_some(offset)
            }
            _ => self.table.get(offset).copied().flatten(),
        }
    }
}
