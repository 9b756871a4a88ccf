//! Field-level reconstruction when no candidate parses.

use regex::Regex;
use serde_json::Value;

use super::locate::matching_close;
use super::record::{ExtractedRecord, NESTED_FIELDS, SCALAR_FIELDS};

/// Longest excerpt of the cleaned text used as a stand-in summary.
const EXCERPT_CHARS: usize = 400;

/// Window past a field name in which its opening brace must appear.
const NESTED_LOOKAHEAD: usize = 10;

/// Assemble a best-effort record straight from the cleaned text.
///
/// Runs only after every candidate and the full-text fallback failed to
/// parse, and cannot itself fail: the worst case is a record holding a
/// truncated text excerpt as `summary` and an empty `sources` list.
/// Individually malformed nested spans are dropped, never fatal; fields that
/// match no pattern stay absent rather than becoming null placeholders.
///
/// Field scanning runs over `text` (whitespace already flattened); the
/// no-brace excerpt is cut from `raw`, the tag-stripped text with its
/// original whitespace intact.
pub(crate) fn reconstruct(text: &str, raw: &str) -> ExtractedRecord {
    let mut record = ExtractedRecord::degraded();

    if !text.contains('{') {
        record.insert("summary", Value::String(excerpt(raw)));
        return record;
    }

    for field in SCALAR_FIELDS {
        if let Some(value) = scalar_field(text, field) {
            record.insert(field, Value::String(value));
        }
    }

    if let Some(score) = opportunity_score(text) {
        record.insert("opportunity_score", Value::from(score));
    }

    if let Some(risks) = risk_factors(text) {
        record.insert("risk_factors", risks);
    }

    for field in NESTED_FIELDS {
        if let Some(object) = nested_object(text, field) {
            record.insert(field, object);
        }
    }

    if let Some(sources) = sources_array(text) {
        record.insert("sources", sources);
    }

    record
}

/// First 400 characters, trimmed.
fn excerpt(text: &str) -> String {
    let taken: String = text.chars().take(EXCERPT_CHARS).collect();
    taken.trim().to_string()
}

/// Recover one quoted text field.
///
/// The value is any run of characters without an unescaped quote. Field
/// names usually arrive quoted, but degraded output drops the quotes or
/// writes `summary is "..."`, so the name is word-bounded with the quotes
/// optional and `is` doubling as the separator. `\"` unescapes to `"` and
/// `\n` to a space on capture.
fn scalar_field(text: &str, field: &str) -> Option<String> {
    let pattern = format!(r#""?\b{field}\b"?\s*(?::|is)\s*"((?:[^"\\]|\\.)*)""#);
    let re = Regex::new(&pattern).expect("valid scalar pattern");
    let captured = re.captures(text)?.get(1)?.as_str();
    Some(captured.replace("\\\"", "\"").replace("\\n", " "))
}

/// Recover the integer score; absent when unmatched, never defaulted.
fn opportunity_score(text: &str) -> Option<i64> {
    let re = Regex::new(r#""?\bopportunity_score\b"?\s*:\s*(\d+)"#).expect("valid score pattern");
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Recover the risk list from the first `[`..`]` span after the name.
///
/// The span is not depth-matched: a risk description containing a literal
/// `]` truncates the list and the parse fails. Unparsable spans are omitted
/// outright, never kept partially.
fn risk_factors(text: &str) -> Option<Value> {
    let re = Regex::new(r#""risk_factors"\s*:\s*(\[[^\]]*\])"#).expect("valid risks pattern");
    let span = re.captures(text)?.get(1)?.as_str();
    serde_json::from_str(span).ok()
}

/// Recover one nested object by name, then depth matching.
///
/// The opening brace must sit within a short window past the field name;
/// without the window, a missing field would latch onto some unrelated
/// distant `{`.
fn nested_object(text: &str, field: &str) -> Option<Value> {
    let name = format!("\"{field}\"");
    let name_at = text.find(&name)?;
    let open = text[name_at..].find('{').map(|i| name_at + i)?;
    if open >= name_at + field.len() + NESTED_LOOKAHEAD {
        return None;
    }
    let close = matching_close(text, open, '{', '}')?;
    serde_json::from_str(&text[open..=close]).ok()
}

/// Recover the sources list from the last mention of the field name.
///
/// Later mentions are more likely the actual field than prose talking about
/// "sources". The array span itself is depth-matched, unlike risk_factors.
fn sources_array(text: &str) -> Option<Value> {
    let name_at = text.rfind("\"sources\"")?;
    let open = text[name_at..].find('[').map(|i| name_at + i)?;
    let close = matching_close(text, open, '[', ']')?;
    serde_json::from_str(&text[open..=close]).ok()
}
