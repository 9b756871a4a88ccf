//! Resilient extraction of intelligence briefs from model output.
//!
//! Models are instructed to respond with a single raw JSON object, but real
//! responses arrive as markdown-fenced JSON, JSON buried in prose, JSON with
//! trailing commas, text littered with citation tags from the web-search
//! tool, or nothing parseable at all. This module recovers a usable record
//! from all of those shapes with a fixed chain of increasingly permissive
//! tiers:
//!
//! 1. Citation/markup tags (`<...>`) are stripped; their bodies can contain
//!    braces that would corrupt depth counting.
//! 2. The interior of the first fenced code block, if any, is tried as a
//!    candidate.
//! 3. The object enclosing the first `"summary"` key is located by walking
//!    back to the enclosing `{` and depth-matching forward.
//! 4. The span from the first `{` to the last `}` is tried.
//! 5. Each candidate (or the whole cleaned text, when no tier located one)
//!    must parse as an object with a non-empty `summary` after whitespace
//!    flattening, with one repair attempt for trailing commas.
//! 6. Failing all of that, individual fields are recovered by pattern and a
//!    degraded record is assembled; this tier cannot fail.
//!
//! The engine is a pure function over the input text: no I/O, no shared
//! state, no error type, safe to call concurrently. Callers that need to
//! distinguish a clean parse from a reconstruction use [`extract_detailed`],
//! which reports the producing tier.

mod locate;
mod normalize;
mod parse;
mod reconstruct;
mod record;

pub use record::{ExtractedRecord, ExtractionTier};

/// A record together with the tier that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The recovered record.
    pub record: ExtractedRecord,
    /// Which tier of the chain produced it.
    pub tier: ExtractionTier,
}

/// Extract an intelligence brief record from raw model output.
///
/// Never fails: when nothing parses, a degraded record reconstructed
/// field-by-field (at minimum a truncated `summary` excerpt and an empty
/// `sources` list) comes back instead.
pub fn extract(text: &str) -> ExtractedRecord {
    extract_detailed(text).record
}

/// Extract a record and report which tier of the chain produced it.
pub fn extract_detailed(text: &str) -> Extraction {
    let cleaned = normalize::strip_tags(text);
    let flattened = normalize::flatten_whitespace(&cleaned);

    let mut located_any = false;

    // Fenced content keeps its internal formatting, so this tier scans the
    // pre-flatten text.
    if let Some(candidate) = locate::first_fenced_block(&cleaned) {
        located_any = true;
        if let Some(record) = parse::parse_candidate(candidate) {
            return Extraction {
                record,
                tier: ExtractionTier::Fence,
            };
        }
    }

    if let Some(candidate) = locate::summary_anchored_object(&flattened) {
        located_any = true;
        if let Some(record) = parse::parse_candidate(candidate) {
            return Extraction {
                record,
                tier: ExtractionTier::AnchoredBraces,
            };
        }
    }

    if let Some(candidate) = locate::outer_brace_span(&flattened) {
        located_any = true;
        if let Some(record) = parse::parse_candidate(candidate) {
            return Extraction {
                record,
                tier: ExtractionTier::OuterSpan,
            };
        }
    }

    if !located_any {
        if let Some(record) = parse::parse_candidate(&cleaned) {
            return Extraction {
                record,
                tier: ExtractionTier::FullText,
            };
        }
    }

    Extraction {
        record: reconstruct::reconstruct(&flattened, &cleaned),
        tier: ExtractionTier::Reconstructed,
    }
}
