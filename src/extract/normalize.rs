//! Input normalization ahead of candidate search.

use regex::Regex;

/// Remove every `<...>` span from the text.
///
/// The web-search tool leaves inline citation tags in responses, and their
/// bodies can contain braces that would corrupt depth counting. Matching is
/// non-greedy with no nested-tag awareness: a literal `<` runs to the next
/// `>`, whatever sits between them, and an unterminated `<` is left alone.
pub(crate) fn strip_tags(text: &str) -> String {
    let re = Regex::new(r"<[^>]+>").expect("valid tag pattern");
    re.replace_all(text, "").into_owned()
}

/// Replace newlines, carriage returns and tabs with single spaces.
///
/// Structural JSON does not need them, and model output embeds literal
/// newlines inside values that both the JSON grammar and the field patterns
/// would otherwise trip over. Fenced content is scanned before this pass so
/// its internal formatting survives.
pub(crate) fn flatten_whitespace(text: &str) -> String {
    text.replace(['\n', '\r', '\t'], " ")
}
