//! Mapping reconstruction from two text versions.
//!
//! When only the redacted output and the original text are available (the
//! span list was consumed by whoever ran detection), the mapping is rebuilt by
//! alignment. The redacted text is split into literal segments and
//! placeholder tokens; literal segments are copied verbatim from the original,
//! so each one is located in the original in order and whatever lies between
//! two located literals is the fragment behind the placeholder(s) in between.
//!
//! Ambiguities are resolved without failing:
//!
//! - The final literal is anchored at the end of the original when possible.
//!   Other literals match at their leftmost position past the cursor.
//! - A literal that also occurs inside the entity before it is therefore
//!   anchored too early: `"[ORG], [LOC]"` against `"Acme, Inc., Paris"`
//!   gives `Acme` and `Inc., Paris`. Both splits are consistent with the two
//!   texts, and the leftmost one is taken. Decoding the same redacted text
//!   still reproduces the original exactly; only the individual fragments
//!   differ. Callers that still hold the spans should use
//!   [`Mapping::from_spans`] instead.
//! - Adjacent placeholders share one gap. The first placeholder of the run
//!   takes the whole gap and the rest get an empty fragment.
//! - Empty fragments never replace an existing entry.
//! - If a literal cannot be found, the remaining original text goes to the
//!   current run and every later placeholder gets an empty fragment.

use crate::mapping::{CollisionPolicy, Mapping};
use crate::span::placeholder_pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// Rebuild the mapping for `redacted` against `original` with the default
/// (last-write-wins) collision policy.
pub fn build_mapping(redacted: &str, original: &str) -> Mapping {
    build_mapping_with(redacted, original, CollisionPolicy::default())
}

/// Rebuild the mapping for `redacted` against `original`.
///
/// Every distinct placeholder token found in `redacted` has an entry in the
/// result, possibly with an empty fragment.
pub fn build_mapping_with(redacted: &str, original: &str, policy: CollisionPolicy) -> Mapping {
    let segments = split(redacted);
    let mut mapping = Mapping::new();
    let mut cursor = 0;
    let mut run: Vec<&str> = Vec::new();
    let mut lost = false;

    for (pos, segment) in segments.iter().enumerate() {
        match *segment {
            Segment::Placeholder(token) => run.push(token),
            Segment::Literal(_) if lost => {
                attribute(&mut mapping, &run, "", policy);
                run.clear();
            }
            Segment::Literal(literal) => {
                let is_last = pos + 1 == segments.len();
                match locate(original, cursor, literal, !run.is_empty(), is_last) {
                    Some(at) => {
                        attribute(&mut mapping, &run, &original[cursor..at], policy);
                        cursor = at + literal.len();
                    }
                    None => {
                        tracing::warn!(
                            literal_len = literal.len(),
                            cursor,
                            "redacted text does not align with original; remaining placeholders get empty fragments"
                        );
                        attribute(&mut mapping, &run, &original[cursor..], policy);
                        cursor = original.len();
                        lost = true;
                    }
                }
                run.clear();
            }
        }
    }

    attribute(&mut mapping, &run, &original[cursor..], policy);
    mapping
}

fn split(redacted: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for found in placeholder_pattern().find_iter(redacted) {
        if found.start() > last {
            segments.push(Segment::Literal(&redacted[last..found.start()]));
        }
        segments.push(Segment::Placeholder(found.as_str()));
        last = found.end();
    }
    if last < redacted.len() {
        segments.push(Segment::Literal(&redacted[last..]));
    }
    segments
}

/// Byte position of `literal` in `original` at or after `cursor`.
///
/// After a placeholder the match must leave at least one character for the
/// fragment, since entity spans are never empty.
fn locate(
    original: &str,
    cursor: usize,
    literal: &str,
    after_placeholder: bool,
    is_last: bool,
) -> Option<usize> {
    let from = if after_placeholder {
        let next = original.get(cursor..)?.chars().next()?;
        cursor + next.len_utf8()
    } else {
        cursor
    };

    if is_last && original.ends_with(literal) {
        let at = original.len() - literal.len();
        if at >= from {
            return Some(at);
        }
    }

    original.get(from..)?.find(literal).map(|rel| from + rel)
}

fn attribute(mapping: &mut Mapping, run: &[&str], fragment: &str, policy: CollisionPolicy) {
    let Some((first, rest)) = run.split_first() else {
        return;
    };
    if fragment.is_empty() {
        mapping.record_if_absent(*first, "");
    } else {
        mapping.record(*first, fragment, policy);
    }
    for token in rest {
        mapping.record_if_absent(*token, "");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    #[test]
    fn test_distinct_categories() {
        let mapping = build_mapping("[PER] met [ORG] in [LOC].", "Alice met Acme Corp in Paris.");
        assert_eq!(mapping.get("[PER]"), Some("Alice"));
        assert_eq!(mapping.get("[ORG]"), Some("Acme Corp"));
        assert_eq!(mapping.get("[LOC]"), Some("Paris"));
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_collision_last_write_wins() {
        let mapping = build_mapping("[PER] met [PER]", "Alice met Bob");
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("[PER]"), Some("Bob"));
        assert_eq!(decode("[PER] met [PER]", &mapping), "Bob met Bob");
    }

    #[test]
    fn test_collision_first_write_wins() {
        let mapping =
            build_mapping_with("[PER] met [PER]", "Alice met Bob", CollisionPolicy::FirstWriteWins);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("[PER]"), Some("Alice"));
        assert_eq!(decode("[PER] met [PER]", &mapping), "Alice met Alice");
    }

    #[test]
    fn test_placeholder_only() {
        let mapping = build_mapping("[PER]", "Alice");
        assert_eq!(mapping.get("[PER]"), Some("Alice"));
    }

    #[test]
    fn test_no_placeholders() {
        assert!(build_mapping("plain text", "plain text").is_empty());
        assert!(build_mapping("", "").is_empty());
    }

    #[test]
    fn test_trailing_literal_anchors_at_end() {
        // Leftmost matching would stop at the first '-' inside the fragment.
        let mapping = build_mapping("[X]-", "a-b-");
        assert_eq!(mapping.get("[X]"), Some("a-b"));
    }

    #[test]
    fn test_literal_repeating_fragment_prefix() {
        let mapping = build_mapping("[X]ab tail", "abab tail");
        assert_eq!(mapping.get("[X]"), Some("ab"));
    }

    #[test]
    fn test_literal_inside_entity_anchors_leftmost() {
        // ", " also occurs inside "Acme, Inc."; the earliest comma wins.
        let original = "Acme, Inc., Paris";
        let redacted = "[ORG], [LOC]";
        let mapping = build_mapping(redacted, original);
        assert_eq!(mapping.get("[ORG]"), Some("Acme"));
        assert_eq!(mapping.get("[LOC]"), Some("Inc., Paris"));
        assert_eq!(decode(redacted, &mapping), original);

        // Span provenance has no such ambiguity.
        let spans = [
            crate::span::EntitySpan::new(0, 10, "org"),
            crate::span::EntitySpan::new(12, 17, "loc"),
        ];
        let exact = Mapping::from_spans(original, &spans, CollisionPolicy::default());
        assert_eq!(exact.get("[ORG]"), Some("Acme, Inc."));
        assert_eq!(exact.get("[LOC]"), Some("Paris"));
    }

    #[test]
    fn test_adjacent_placeholders_share_gap() {
        let mapping = build_mapping("Hi [PER][LOC]!", "Hi AliceParis!");
        assert_eq!(mapping.get("[PER]"), Some("AliceParis"));
        assert_eq!(mapping.get("[LOC]"), Some(""));
        assert_eq!(decode("Hi [PER][LOC]!", &mapping), "Hi AliceParis!");
    }

    #[test]
    fn test_empty_fragment_never_overwrites() {
        let mapping = build_mapping("[LOC] and [PER][LOC]", "Rome and BobParis");
        assert_eq!(mapping.get("[LOC]"), Some("Rome"));
        assert_eq!(mapping.get("[PER]"), Some("BobParis"));
    }

    #[test]
    fn test_unaligned_texts_still_cover_every_placeholder() {
        let mapping = build_mapping("[PER] zzz [LOC] yyy", "Alice met Bob");
        assert_eq!(mapping.get("[PER]"), Some("Alice met Bob"));
        assert_eq!(mapping.get("[LOC]"), Some(""));
    }

    #[test]
    fn test_multibyte_fragments() {
        let mapping = build_mapping("[PER] vit à [LOC]", "Zoë vit à Besançon");
        assert_eq!(mapping.get("[PER]"), Some("Zoë"));
        assert_eq!(mapping.get("[LOC]"), Some("Besançon"));
    }

    #[test]
    fn test_bracketed_text_in_original_maps_to_itself() {
        let mapping = build_mapping("[NOTE] [PER] called", "[NOTE] Alice called");
        assert_eq!(mapping.get("[NOTE]"), Some("[NOTE]"));
        assert_eq!(mapping.get("[PER]"), Some("Alice"));
    }
}
