//! Candidate parsing: flatten, strict parse, one repair attempt.

use regex::Regex;
use serde_json::Value;

use super::record::ExtractedRecord;

/// Parse a candidate span into a usable record.
///
/// Newlines, carriage returns and tabs are flattened to spaces first. A
/// strict parse is tried, then one repaired parse with trailing commas
/// before `}`/`]` removed. The result is accepted only when it is an object
/// carrying a non-empty `summary` string; technically-valid-but-irrelevant
/// JSON (an empty `{}` picked up from unrelated markup, say) is rejected so
/// the chain keeps looking.
pub(crate) fn parse_candidate(candidate: &str) -> Option<ExtractedRecord> {
    let flat = candidate.replace(['\n', '\r', '\t'], " ");
    accept(&flat).or_else(|| accept(&strip_trailing_commas(&flat)))
}

fn accept(json: &str) -> Option<ExtractedRecord> {
    let value: Value = serde_json::from_str(json).ok()?;
    let Value::Object(fields) = value else {
        return None;
    };
    match fields.get("summary") {
        Some(Value::String(summary)) if !summary.is_empty() => {
            Some(ExtractedRecord::from_object(fields))
        }
        _ => None,
    }
}

/// Remove trailing commas before closing braces and brackets.
fn strip_trailing_commas(json: &str) -> String {
    let before_brace = Regex::new(r",\s*\}").expect("valid pattern");
    let before_bracket = Regex::new(r",\s*\]").expect("valid pattern");
    let fixed = before_brace.replace_all(json, "}");
    before_bracket.replace_all(&fixed, "]").into_owned()
}
