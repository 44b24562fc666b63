//! Template decoding: placeholders back to original fragments.

use crate::mapping::Mapping;
use crate::span::placeholder_pattern;

/// Outcome of decoding with per-token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Restored text
    pub text: String,
    /// Number of placeholder occurrences substituted
    pub resolved: usize,
    /// Placeholder occurrences with no mapping entry, left as-is, in order
    pub unresolved: Vec<String>,
}

impl Decoded {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Replace every placeholder occurrence in `redacted` with its mapped fragment.
///
/// Tokens without an entry stay in the output verbatim. Text without any
/// placeholder syntax is returned unchanged.
pub fn decode(redacted: &str, mapping: &Mapping) -> String {
    decode_report(redacted, mapping).text
}

/// Like [`decode`], but also reports which placeholders could not be resolved.
pub fn decode_report(redacted: &str, mapping: &Mapping) -> Decoded {
    let mut decoded = Decoded {
        text: String::with_capacity(redacted.len()),
        ..Decoded::default()
    };

    let mut last = 0;
    for found in placeholder_pattern().find_iter(redacted) {
        decoded.text.push_str(&redacted[last..found.start()]);
        match mapping.get(found.as_str()) {
            Some(fragment) => {
                decoded.text.push_str(fragment);
                decoded.resolved += 1;
            }
            None => {
                tracing::debug!(token = found.as_str(), "unresolved placeholder left in place");
                decoded.text.push_str(found.as_str());
                decoded.unresolved.push(found.as_str().to_string());
            }
        }
        last = found.end();
    }
    decoded.text.push_str(&redacted[last..]);

    decoded
}

/// Resolve a single token, falling back to the token itself.
pub fn decode_word<'a>(word: &'a str, mapping: &'a Mapping) -> &'a str {
    mapping.get(word).unwrap_or(word)
}
