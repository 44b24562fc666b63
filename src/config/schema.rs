use crate::mapping::CollisionPolicy;
use crate::span::OffsetUnit;
use serde::Deserialize;
use std::fmt;

/// Engine settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Unit the detector reports offsets in
    pub offset_unit: OffsetUnit,
    /// Which fragment survives when placeholders collide
    pub collision_policy: CollisionPolicy,
    /// Inputs longer than this are left untouched. Length is counted in
    /// `offset_unit`, so a JavaScript host's `text.length` limit carries over
    /// with `offset_unit = "utf16"`.
    pub max_input_chars: Option<usize>,
    /// Drop all but the first span of each overlapping cluster
    pub drop_overlapping: bool,
    /// Only redact these categories (case-insensitive); all when unset
    pub categories: Option<Vec<String>>,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.max_input_chars == Some(0) {
            issues.push(ValidationIssue::InvalidValue {
                field: "max_input_chars",
                message: "must be greater than zero".to_string(),
            });
        }

        if let Some(categories) = &self.categories {
            if categories.is_empty() {
                issues.push(ValidationIssue::InvalidValue {
                    field: "categories",
                    message: "empty list would redact nothing; omit the field to redact all"
                        .to_string(),
                });
            }
            for category in categories {
                if category.trim().is_empty() {
                    issues.push(ValidationIssue::InvalidValue {
                        field: "categories",
                        message: "category names must not be blank".to_string(),
                    });
                } else if !is_placeholder_safe(category) {
                    issues.push(ValidationIssue::UndecodableCategory {
                        category: category.clone(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Whether spans of `category` should be redacted.
    ///
    /// Names compare by their uppercased form, the same one the placeholder
    /// token uses.
    pub fn redacts(&self, category: &str) -> bool {
        match &self.categories {
            None => true,
            Some(allowed) => {
                let wanted = category.to_uppercase();
                allowed.iter().any(|c| c.to_uppercase() == wanted)
            }
        }
    }
}

/// Whether the uppercased category yields a token the decoder recognizes.
fn is_placeholder_safe(category: &str) -> bool {
    category
        .to_uppercase()
        .chars()
        .all(|c| c.is_ascii_uppercase() || c == '_')
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    InvalidValue {
        field: &'static str,
        message: String,
    },
    UndecodableCategory {
        category: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
            ValidationIssue::UndecodableCategory { category } => write!(
                f,
                "category '{category}' produces a placeholder that cannot be restored (use A-Z and _)"
            ),
        }
    }
}
