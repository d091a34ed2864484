//! Labelled text spans.
//!
//! References and predictions share one shape. Records coming from
//! extraction models are loosely structured, so deserialization probes
//! several field names and falls back to an empty string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names probed for the span text, in priority order
pub const TEXT_KEYS: &[&str] = &["text", "span", "segment"];

/// Field names probed for the label, in priority order
pub const LABEL_KEYS: &[&str] = &["category", "label", "type"];

/// A labelled text span
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Annotation {
    /// Taxonomy label
    pub label: String,

    /// Span text
    pub text: String,
}

impl Annotation {
    /// Create a new annotation
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    /// Build an annotation from an arbitrary JSON record.
    ///
    /// Objects are probed for [`TEXT_KEYS`] and [`LABEL_KEYS`]; a bare string
    /// becomes the text with an empty label. Anything else is rendered as text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self {
                label: probe(value, LABEL_KEYS),
                text: probe(value, TEXT_KEYS),
            },
            Value::Null => Self::new("", ""),
            Value::String(s) => Self::new("", s.clone()),
            other => Self::new("", other.to_string()),
        }
    }
}

impl From<Value> for Annotation {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

/// Return the first present key rendered as a string, or "" if none match
fn probe(record: &Value, keys: &[&str]) -> String {
    for key in keys {
        if let Some(value) = record.get(*key) {
            return match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
        }
    }
    String::new()
}
