use crate::detector::DetectionError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedactError {
    /// Detection failed; the text was not redacted.
    ///
    /// Carries the original input so callers can fall back to it.
    #[error("entity detection unavailable, text left unredacted: {source}")]
    DetectionUnavailable {
        #[source]
        source: DetectionError,
        original: String,
    },
}

impl RedactError {
    /// Text to use when failing open: the unredacted input.
    pub fn fallback_text(&self) -> &str {
        match self {
            RedactError::DetectionUnavailable { original, .. } => original,
        }
    }

    pub fn into_fallback_text(self) -> String {
        match self {
            RedactError::DetectionUnavailable { original, .. } => original,
        }
    }
}
