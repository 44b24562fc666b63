//! Entity detector boundary.
//!
//! Detection itself (NER inference) lives outside this crate. A detector hands
//! back a [`Detection`]: either the raw entity entries, which still go through
//! the validator, or a typed failure the caller can act on.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("entity detector unavailable: {0}")]
    Unavailable(String),

    #[error("entity detector returned malformed output: {0}")]
    Malformed(String),
}

/// Raw entity entries, or why there are none.
pub type Detection = Result<Vec<Value>, DetectionError>;

/// Capability interface for anything that can find entities in text.
pub trait EntityDetector {
    fn detect(&self, text: &str) -> Detection;
}

impl<F> EntityDetector for F
where
    F: Fn(&str) -> Detection,
{
    fn detect(&self, text: &str) -> Detection {
        self(text)
    }
}

/// Parse a detector's JSON response.
///
/// The top level must be an array. Entries are not inspected here; shape
/// checks belong to the validator so bad entries are dropped individually.
pub fn parse_detector_output(json: &str) -> Detection {
    let value: Value =
        serde_json::from_str(json).map_err(|e| DetectionError::Malformed(e.to_string()))?;
    match value {
        Value::Array(entries) => Ok(entries),
        other => Err(DetectionError::Malformed(format!(
            "expected a JSON array of entities, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Detector that returns the same entries for every input.
///
/// Used when detection already happened elsewhere (e.g. an entities file) and
/// in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    entries: Vec<Value>,
}

impl StaticDetector {
    pub fn new(entries: Vec<Value>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, DetectionError> {
        parse_detector_output(json).map(Self::new)
    }
}

impl EntityDetector for StaticDetector {
    fn detect(&self, _text: &str) -> Detection {
        Ok(self.entries.clone())
    }
}
