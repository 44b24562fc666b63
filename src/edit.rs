use crate::span::EntitySpan;

/// The fundamental edit primitive: in-memory byte-span replacement.
///
/// Redaction compiles down to a batch of these, one per entity span. Spans
/// are acquired and checked by the validator; application itself never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
}

/// Result of applying one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditResult {
    /// Edit applied at the requested range
    Applied {
        byte_start: usize,
        bytes_removed: usize,
        bytes_inserted: usize,
    },
    /// The requested range no longer fit the text and was narrowed first
    Clamped {
        requested: (usize, usize),
        applied: (usize, usize),
    },
}

impl Edit {
    pub fn new(byte_start: usize, byte_end: usize, new_text: impl Into<String>) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
        }
    }

    /// Edit that replaces an entity span with its placeholder token.
    pub fn redaction(span: &EntitySpan) -> Self {
        Self::new(span.start, span.end, span.placeholder())
    }

    /// Splice this edit into `text`.
    ///
    /// An out-of-range or mid-character range is narrowed to the text length
    /// and the nearest preceding char boundary instead of panicking. A range
    /// that collapses to empty becomes an insertion.
    pub fn apply_to(&self, text: &mut String) -> EditResult {
        let end = floor_char_boundary(text, self.byte_end);
        let start = floor_char_boundary(text, self.byte_start).min(end);

        text.replace_range(start..end, &self.new_text);

        if (start, end) == (self.byte_start, self.byte_end) {
            EditResult::Applied {
                byte_start: start,
                bytes_removed: end - start,
                bytes_inserted: self.new_text.len(),
            }
        } else {
            EditResult::Clamped {
                requested: (self.byte_start, self.byte_end),
                applied: (start, end),
            }
        }
    }
}

/// Apply multiple edits to `text`, returning the rewritten copy.
///
/// Edits are sorted by byte_start descending and applied right-to-left so
/// that replacements of a different length never shift the offsets of edits
/// still pending further left. The sort is stable: edits sharing a start are
/// applied in input order, and the later one wins where they overlap.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.byte_start.cmp(&a.byte_start));

    let mut output = text.to_string();
    for edit in &edits {
        if let EditResult::Clamped { requested, applied } = edit.apply_to(&mut output) {
            tracing::debug!(
                ?requested,
                ?applied,
                "edit range narrowed; overlapping spans may garble placeholders"
            );
        }
    }
    output
}

/// Replace every span with its `[CATEGORY]` placeholder.
///
/// Spans are expected to come from the validator. Overlapping spans are
/// tolerated but can leave a partially overwritten placeholder behind.
pub fn apply(text: &str, spans: &[EntitySpan]) -> String {
    apply_edits(text, spans.iter().map(Edit::redaction).collect())
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
