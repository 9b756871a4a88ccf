//! Candidate locators: the strategies that slice a JSON candidate out of
//! cleaned response text.

use regex::Regex;

/// Interior of the first triple-backtick fence, optionally tagged `json`.
///
/// Later fences are never consulted: when the first fence's contents fail to
/// parse downstream, the chain moves on to the next strategy rather than to
/// a second fence.
pub(crate) fn first_fenced_block(text: &str) -> Option<&str> {
    let re = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid fence pattern");
    let interior = re.captures(text)?.get(1)?.as_str().trim();
    (!interior.is_empty()).then_some(interior)
}

/// The object enclosing the first `"summary"` key.
///
/// Walks backward from the anchor to the enclosing `{` (balancing any closed
/// objects passed on the way), then forward with a signed depth counter
/// until it returns to zero. Anchoring on a field that well-formed briefs
/// always carry survives prose that itself contains braces, where a bare
/// first-`{`-to-last-`}` scan does not. No anchor, no enclosing `{`, or no
/// balance before end of text means no candidate.
pub(crate) fn summary_anchored_object(text: &str) -> Option<&str> {
    let anchor = text.find("\"summary\"")?;
    let open = enclosing_open(&text[..anchor])?;
    let close = matching_close(text, open, '{', '}')?;
    Some(&text[open..=close])
}

/// The span from the first `{` to the last `}`, when ordered.
///
/// Unanchored and least reliable; it only exists to catch responses whose
/// `summary` key itself was malformed or omitted.
pub(crate) fn outer_brace_span(text: &str) -> Option<&str> {
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    (last > first).then(|| &text[first..=last])
}

/// Byte index of the `{` that encloses the end of `prefix`.
fn enclosing_open(prefix: &str) -> Option<usize> {
    let mut depth: i32 = 0;
    for (i, c) in prefix.char_indices().rev() {
        match c {
            '}' => depth += 1,
            '{' if depth == 0 => return Some(i),
            '{' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Byte index of the delimiter balancing the opener at `open`.
///
/// Plain depth counting over raw characters; string literals are not
/// tracked, so a closer inside a quoted value ends the span early.
pub(crate) fn matching_close(text: &str, open: usize, opener: char, closer: char) -> Option<usize> {
    let mut depth: i32 = 0;
    for (i, c) in text[open..].char_indices() {
        if c == opener {
            depth += 1;
        } else if c == closer {
            depth -= 1;
        }
        if depth == 0 {
            return Some(open + i);
        }
    }
    None
}
