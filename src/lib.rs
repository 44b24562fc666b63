//! Redact Engine: reversible redaction of named entities in text
//!
//! Replaces detected entity spans with category placeholders such as `[PER]`
//! and keeps a mapping that turns redacted text back into the original.
//!
//! # Architecture
//!
//! Entity detection happens elsewhere, behind [`EntityDetector`]. This crate
//! consumes its output (spans with category labels) and runs it through four
//! stages:
//!
//! 1. [`validate`]: drop spans that are malformed or out of range
//! 2. [`edit`]: rewrite the text, applying spans right-to-left
//! 3. [`align`]: rebuild a [`Mapping`] from the redacted and original texts
//! 4. [`decode`]: substitute placeholders back
//!
//! [`RedactionSession`] ties the stages together and holds the mapping
//! between a redaction and its restore.
//!
//! # Guarantees
//!
//! - No operation panics on any span list or text
//! - Text outside the redacted spans is preserved byte for byte
//! - Non-overlapping spans with distinct categories round-trip exactly
//!
//! Placeholders carry only the category, so several entities of the same
//! category share one mapping entry; see [`CollisionPolicy`].
//!
//! # Example
//!
//! ```
//! use redact_engine::{RawSpan, RedactionSession};
//!
//! let mut session = RedactionSession::default();
//! let text = "Alice flew to Paris";
//! let redaction = session.redact_spans(
//!     text,
//!     &[RawSpan::new(0, 5, "per"), RawSpan::new(14, 19, "loc")],
//! );
//!
//! assert_eq!(redaction.text, "[PER] flew to [LOC]");
//! assert_eq!(session.restore(&redaction.text), text);
//! ```

pub mod align;
pub mod config;
pub mod decode;
pub mod detector;
pub mod edit;
pub mod error;
pub mod mapping;
pub mod session;
pub mod span;
pub mod validate;

// Re-exports
pub use align::{build_mapping, build_mapping_with};
pub use config::{load_from_path, load_from_str, ConfigError, EngineConfig};
pub use decode::{decode, decode_report, decode_word, Decoded};
pub use detector::{parse_detector_output, Detection, DetectionError, EntityDetector, StaticDetector};
pub use edit::{apply, apply_edits, Edit, EditResult};
pub use error::RedactError;
pub use mapping::{CollisionPolicy, Mapping};
pub use session::{Redaction, RedactionSession, RedactionStatus, SharedSession};
pub use span::{placeholder, EntitySpan, OffsetUnit, RawSpan};
pub use validate::{
    drop_overlapping, find_overlaps, validate_raw, validate_spans, SpanIssue, ValidatedSpans,
};
