//! The extracted record type and tier reporting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scalar text fields the reconstructor knows how to recover.
pub(crate) const SCALAR_FIELDS: [&str; 5] = [
    "summary",
    "timing_insight",
    "opportunity_reasoning",
    "intent_confidence",
    "intent_reasoning",
];

/// Nested-object fields the reconstructor knows how to recover.
pub(crate) const NESTED_FIELDS: [&str; 3] = [
    "procurement_patterns",
    "incumbent_landscape",
    "organizational_context",
];

/// Which tier of the extraction chain produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTier {
    /// Contents of the first fenced code block parsed cleanly.
    Fence,
    /// The object enclosing the `"summary"` anchor parsed cleanly.
    AnchoredBraces,
    /// The first-`{`-to-last-`}` span parsed cleanly.
    OuterSpan,
    /// The whole cleaned text parsed cleanly after no tier located a candidate.
    FullText,
    /// Assembled field-by-field after every parse attempt failed.
    Reconstructed,
}

impl ExtractionTier {
    /// True when the record came from a full JSON parse rather than
    /// field-by-field reconstruction.
    pub fn is_parsed(&self) -> bool {
        !matches!(self, ExtractionTier::Reconstructed)
    }
}

/// An intelligence brief recovered from model output.
///
/// Wraps the parsed JSON object unmodified, so a record produced by a full
/// parse carries exactly the fields the model emitted, whatever they are.
/// The typed accessors cover the recognized field set. Reconstructed records
/// carry only the fields that could be recovered by pattern, plus `sources`,
/// which always defaults to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedRecord {
    fields: Map<String, Value>,
}

impl ExtractedRecord {
    /// Wrap a parsed JSON object.
    pub fn from_object(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Starting point for the reconstructor: nothing but the default empty
    /// `sources` list.
    pub(crate) fn degraded() -> Self {
        let mut fields = Map::new();
        fields.insert("sources".to_string(), Value::Array(Vec::new()));
        Self { fields }
    }

    pub(crate) fn insert(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    /// All fields, keyed by name.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up a field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The executive summary, when present as text.
    pub fn summary(&self) -> Option<&str> {
        self.fields.get("summary").and_then(Value::as_str)
    }

    /// The opportunity score, only when present as an integer.
    pub fn opportunity_score(&self) -> Option<i64> {
        self.fields.get("opportunity_score").and_then(Value::as_i64)
    }

    /// The cited sources, when present as a list.
    pub fn sources(&self) -> Option<&Vec<Value>> {
        self.fields.get("sources").and_then(Value::as_array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ExtractedRecord {
        match value {
            Value::Object(fields) => ExtractedRecord::from_object(fields),
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_typed_accessors() {
        let rec = record(json!({
            "summary": "ok",
            "opportunity_score": 72,
            "sources": [{"url": "https://example.org"}],
        }));
        assert_eq!(rec.summary(), Some("ok"));
        assert_eq!(rec.opportunity_score(), Some(72));
        assert_eq!(rec.sources().map(Vec::len), Some(1));
    }

    #[test]
    fn test_score_accessor_rejects_non_integers() {
        let rec = record(json!({"opportunity_score": "85"}));
        assert_eq!(rec.opportunity_score(), None);

        let rec = record(json!({"opportunity_score": 85.5}));
        assert_eq!(rec.opportunity_score(), None);
    }

    #[test]
    fn test_unrecognized_fields_are_preserved() {
        let rec = record(json!({"summary": "ok", "extra_key": {"deep": true}}));
        assert_eq!(rec.get("extra_key"), Some(&json!({"deep": true})));
        assert_eq!(rec.fields().len(), 2);
    }

    #[test]
    fn test_degraded_starts_with_empty_sources() {
        let rec = ExtractedRecord::degraded();
        assert_eq!(rec.sources(), Some(&Vec::new()));
        assert_eq!(rec.fields().len(), 1);
    }

    #[test]
    fn test_serializes_transparently() {
        let rec = record(json!({"summary": "ok"}));
        let raw = serde_json::to_string(&rec).expect("serializable");
        assert_eq!(raw, r#"{"summary":"ok"}"#);
    }

    #[test]
    fn test_tier_is_parsed() {
        assert!(ExtractionTier::Fence.is_parsed());
        assert!(ExtractionTier::AnchoredBraces.is_parsed());
        assert!(ExtractionTier::OuterSpan.is_parsed());
        assert!(ExtractionTier::FullText.is_parsed());
        assert!(!ExtractionTier::Reconstructed.is_parsed());
    }
}
