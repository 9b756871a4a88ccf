//! Integration tests for the extraction engine.
//!
//! These exercise the public `extract` surface with realistic batch
//! responses: fenced JSON with surrounding chatter, web-search citation
//! markup, partially broken output, and responses with no JSON at all.

use civant_enrich::{extract, extract_detailed, ExtractionTier};
use serde_json::json;

/// A complete, well-formed brief as the prompt contract requests it.
const FULL_BRIEF: &str = r#"{"summary":"Madrid City Council shows a strong three-year IT renewal cycle with the incumbent's contract ending in late 2026.","procurement_patterns":{"renewal_cycle":"IT services every 3 years","spend_trend":"increasing","typical_value_range":"150k-650k","preferred_categories":["IT services","Facilities"],"notes":"framework usage growing"},"incumbent_landscape":{"known_suppliers":["Acme Systems","Iberia Soft"],"dominant_supplier":"Acme Systems","contract_notes":"Acme holds 6 of 12 contracts"},"organizational_context":{"type":"municipality","leadership":"A. Garcia","recent_changes":"new CIO appointed","size_indicator":"large"},"risk_factors":["incumbent lock-in","budget freeze risk"],"timing_insight":"Engage 9-12 months before the 2026 renewal","opportunity_score":82,"opportunity_reasoning":"Clear approaching renewal with open competition history","intent_confidence":"high","intent_reasoning":"6 contracts with consistent cadence","sources":[{"url":"https://contrataciondelestado.es","title":"Award notice","relevance":"latest award"}]}"#;

#[test]
fn test_ideal_raw_json_response() {
    let result = extract_detailed(FULL_BRIEF);
    assert!(result.tier.is_parsed());
    assert_eq!(
        serde_json::to_value(&result.record).expect("serializable"),
        serde_json::from_str::<serde_json::Value>(FULL_BRIEF).expect("valid json")
    );
}

#[test]
fn test_markdown_wrapped_response_with_chatter() {
    let input = format!(
        "Here is the intelligence brief you requested:\n\n```json\n{FULL_BRIEF}\n```\n\nLet me know if you need a deeper dive."
    );
    let result = extract_detailed(&input);
    assert_eq!(result.tier, ExtractionTier::Fence);
    assert_eq!(result.record, extract(FULL_BRIEF));
}

#[test]
fn test_response_with_citation_tags_and_preamble() {
    let input = format!(
        "Based on my research<cite index=\"2\">council minutes</cite>, the brief follows.\n{FULL_BRIEF}"
    );
    let record = extract(&input);
    assert_eq!(record.summary(), extract(FULL_BRIEF).summary());
    assert_eq!(record.opportunity_score(), Some(82));
}

#[test]
fn test_trailing_comma_response() {
    let input = r#"{"summary":"Buyer renews annually.","opportunity_score":55,}"#;
    let record = extract(input);
    assert_eq!(record.summary(), Some("Buyer renews annually."));
    assert_eq!(record.opportunity_score(), Some(55));
}

#[test]
fn test_summary_after_nested_object_is_still_anchored() {
    let input = r#"Model note: output follows. {"procurement_patterns":{"renewal_cycle":"annual","spend_trend":"stable"},"summary":"Annual renewals, modest values.","opportunity_score":48} Done."#;
    let result = extract_detailed(input);
    assert_eq!(result.tier, ExtractionTier::AnchoredBraces);
    assert_eq!(result.record.summary(), Some("Annual renewals, modest values."));
    assert_eq!(
        result.record.get("procurement_patterns"),
        Some(&json!({"renewal_cycle": "annual", "spend_trend": "stable"}))
    );
}

#[test]
fn test_degraded_response_recovers_individual_fields() {
    let input = r#"I could not produce valid JSON. summary is "Buyer X shows strong renewal pattern" and opportunity_score: 85 but json is broken {{{"#;
    let result = extract_detailed(input);
    assert_eq!(result.tier, ExtractionTier::Reconstructed);
    assert_eq!(
        result.record.summary(),
        Some("Buyer X shows strong renewal pattern")
    );
    assert_eq!(result.record.opportunity_score(), Some(85));
    assert_eq!(result.record.sources(), Some(&Vec::new()));
}

#[test]
fn test_partially_broken_json_keeps_nested_objects() {
    // Unbalanced overall, but individual recognized fields are intact.
    let input = r#"{"summary": "Partial output", "procurement_patterns": {"renewal_cycle": "2y"}, "risk_factors": ["funding"], "sources": [{"url": "https://example.org"}"#;
    let result = extract_detailed(input);
    assert_eq!(result.tier, ExtractionTier::Reconstructed);
    assert_eq!(result.record.summary(), Some("Partial output"));
    assert_eq!(
        result.record.get("procurement_patterns"),
        Some(&json!({"renewal_cycle": "2y"}))
    );
    assert_eq!(result.record.get("risk_factors"), Some(&json!(["funding"])));
    // The sources array never closes, so the default empty list stands.
    assert_eq!(result.record.sources(), Some(&Vec::new()));
}

#[test]
fn test_plain_refusal_yields_excerpt_brief() {
    let input = "I was unable to find reliable information about this buyer.";
    let result = extract_detailed(input);
    assert_eq!(result.tier, ExtractionTier::Reconstructed);
    assert_eq!(result.record.summary(), Some(input));
    assert_eq!(result.record.sources(), Some(&Vec::new()));
    // Stable under repetition.
    assert_eq!(extract(input), extract(input));
}

#[test]
fn test_long_refusal_is_truncated_to_400_chars() {
    let input = "No data. ".repeat(100);
    let record = extract(&input);
    let summary = record.summary().expect("excerpt");
    assert!(summary.chars().count() <= 400);
    assert!(input.trim().starts_with(summary.chars().take(20).collect::<String>().as_str()));
}

#[test]
fn test_prose_wrapping_does_not_change_result() {
    let wrapped = format!("Certainly. Here is the analysis.\n\n{FULL_BRIEF}\n\nEnd of brief.");
    assert_eq!(extract(FULL_BRIEF), extract(&wrapped));
}

#[test]
fn test_unknown_fields_survive_full_parse() {
    let input = r#"{"summary":"ok","model_added_extra":"kept verbatim"}"#;
    let record = extract(input);
    assert_eq!(
        record.get("model_added_extra"),
        Some(&json!("kept verbatim"))
    );
}
