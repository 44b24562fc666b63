//! Placeholder → original fragment mapping.

use crate::span::EntitySpan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How to resolve two fragments recorded under the same placeholder.
///
/// Placeholders carry only the category, so `[PER]` for "Alice" and `[PER]`
/// for "Bob" share a key and only one fragment survives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// The fragment recorded last (rightmost in the document) is kept
    #[default]
    LastWriteWins,
    /// The fragment recorded first (leftmost in the document) is kept
    FirstWriteWins,
}

/// Reversible association from placeholder token to the fragment it replaced.
///
/// Keyed by the literal placeholder string (e.g. `"[PER]"`). Serializes as a
/// flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping {
    entries: BTreeMap<String, String>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping directly from the spans that produced a redaction.
    ///
    /// Spans are recorded in document order, so the collision policy sees the
    /// same sequence as [`crate::align::build_mapping_with`] does.
    pub fn from_spans(text: &str, spans: &[EntitySpan], policy: CollisionPolicy) -> Self {
        let mut ordered: Vec<&EntitySpan> = spans.iter().collect();
        ordered.sort_by_key(|span| span.start);

        let mut mapping = Self::new();
        for span in ordered {
            if let Some(fragment) = text.get(span.start..span.end) {
                mapping.record(span.placeholder(), fragment, policy);
            }
        }
        mapping
    }

    /// Record a fragment for `token` under `policy`.
    ///
    /// Returns `true` if the stored fragment changed.
    pub fn record(
        &mut self,
        token: impl Into<String>,
        fragment: impl Into<String>,
        policy: CollisionPolicy,
    ) -> bool {
        let token = token.into();
        let fragment = fragment.into();
        let unchanged = self.entries.get(&token).map(|existing| *existing == fragment);
        match unchanged {
            Some(true) => false,
            Some(false) if policy == CollisionPolicy::FirstWriteWins => false,
            Some(false) => {
                tracing::debug!(%token, "placeholder collision, keeping latest fragment");
                self.entries.insert(token, fragment);
                true
            }
            None => {
                self.entries.insert(token, fragment);
                true
            }
        }
    }

    /// Record a fragment only if `token` has no entry yet.
    pub fn record_if_absent(&mut self, token: impl Into<String>, fragment: impl Into<String>) -> bool {
        self.record(token, fragment, CollisionPolicy::FirstWriteWins)
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in placeholder order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Mapping {
    /// Collects with last-write-wins.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
