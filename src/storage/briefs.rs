//! Brief row construction.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

use crate::extract::ExtractedRecord;
use crate::llm::cost::round_to_micros;

/// Category under which batch-produced briefs are stored.
pub const BRIEF_CATEGORY: &str = "forecast";

/// Intent fields folded into the stored `procurement_intent` document.
const INTENT_FIELDS: [&str; 4] = [
    "intent_confidence",
    "intent_reasoning",
    "opportunity_reasoning",
    "timing_insight",
];

/// A row destined for `buyer_research_briefs`.
#[derive(Debug, Clone)]
pub struct BriefRow {
    pub tenant_id: String,
    pub buyer_name: String,
    pub country: String,
    pub category: String,
    pub summary: Option<String>,
    pub procurement_intent: Value,
    pub organizational_context: Option<Value>,
    pub incumbent_landscape: Option<Value>,
    pub risk_factors: Option<Value>,
    pub opportunity_score: Option<i64>,
    pub sources: Option<Value>,
    pub model_used: String,
    pub tokens_used: i64,
    pub research_cost_usd: f64,
    pub status: String,
    pub expires_at: DateTime<Utc>,
}

impl BriefRow {
    /// Assemble a row from an extracted brief and its response usage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_brief(
        tenant_id: &str,
        buyer_name: &str,
        country: &str,
        record: &ExtractedRecord,
        model_used: &str,
        tokens_used: u64,
        research_cost_usd: f64,
        ttl_days: i64,
    ) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            buyer_name: buyer_name.to_string(),
            country: country.to_string(),
            category: BRIEF_CATEGORY.to_string(),
            summary: record.summary().map(str::to_string),
            procurement_intent: procurement_intent(record),
            organizational_context: record.get("organizational_context").cloned(),
            incumbent_landscape: record.get("incumbent_landscape").cloned(),
            risk_factors: record.get("risk_factors").cloned(),
            opportunity_score: record.opportunity_score(),
            sources: record.get("sources").cloned(),
            model_used: model_used.to_string(),
            tokens_used: tokens_used as i64,
            research_cost_usd: round_to_micros(research_cost_usd),
            status: "complete".to_string(),
            expires_at: Utc::now() + Duration::days(ttl_days),
        }
    }
}

/// Merge the procurement patterns with the intent and timing fields into the
/// single document the briefs table stores.
fn procurement_intent(record: &ExtractedRecord) -> Value {
    let mut intent = match record.get("procurement_patterns") {
        Some(Value::Object(patterns)) => patterns.clone(),
        _ => Map::new(),
    };
    for field in INTENT_FIELDS {
        intent.insert(
            field.to_string(),
            record.get(field).cloned().unwrap_or(Value::Null),
        );
    }
    Value::Object(intent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use serde_json::json;

    fn full_record() -> ExtractedRecord {
        extract(
            r#"{"summary":"Strong candidate","procurement_patterns":{"renewal_cycle":"3y","spend_trend":"stable"},"incumbent_landscape":{"known_suppliers":["Acme"]},"organizational_context":{"type":"municipality"},"risk_factors":["lock-in"],"timing_insight":"engage Q3","opportunity_score":78,"opportunity_reasoning":"clear cycle","intent_confidence":"high","intent_reasoning":"3+ contracts","sources":[{"url":"https://example.org"}]}"#,
        )
    }

    #[test]
    fn test_from_brief_maps_recognized_fields() {
        let record = full_record();
        let row = BriefRow::from_brief("tenant", "Buyer", "ES", &record, "claude-haiku-4-5", 1600, 0.017, 7);

        assert_eq!(row.summary.as_deref(), Some("Strong candidate"));
        assert_eq!(row.opportunity_score, Some(78));
        assert_eq!(row.category, BRIEF_CATEGORY);
        assert_eq!(row.status, "complete");
        assert_eq!(row.tokens_used, 1600);
        assert_eq!(row.research_cost_usd, 0.017);
        assert_eq!(
            row.organizational_context,
            Some(json!({"type": "municipality"}))
        );
        assert_eq!(row.risk_factors, Some(json!(["lock-in"])));
        assert_eq!(row.sources, Some(json!([{"url": "https://example.org"}])));
    }

    #[test]
    fn test_procurement_intent_merges_patterns_and_intent_fields() {
        let record = full_record();
        let row = BriefRow::from_brief("t", "B", "ES", &record, "m", 0, 0.0, 7);

        assert_eq!(
            row.procurement_intent,
            json!({
                "renewal_cycle": "3y",
                "spend_trend": "stable",
                "intent_confidence": "high",
                "intent_reasoning": "3+ contracts",
                "opportunity_reasoning": "clear cycle",
                "timing_insight": "engage Q3"
            })
        );
    }

    #[test]
    fn test_missing_fields_become_null_intent_entries() {
        let record = extract(r#"{"summary":"minimal"}"#);
        let row = BriefRow::from_brief("t", "B", "FR", &record, "m", 10, 0.001, 7);

        assert_eq!(
            row.procurement_intent,
            json!({
                "intent_confidence": null,
                "intent_reasoning": null,
                "opportunity_reasoning": null,
                "timing_insight": null
            })
        );
        assert!(row.organizational_context.is_none());
        assert!(row.opportunity_score.is_none());
    }

    #[test]
    fn test_non_integer_score_is_dropped() {
        let record = extract(r#"{"summary":"ok","opportunity_score":"85"}"#);
        let row = BriefRow::from_brief("t", "B", "IE", &record, "m", 0, 0.0, 7);
        assert!(row.opportunity_score.is_none());
    }

    #[test]
    fn test_expires_at_honors_ttl() {
        let record = extract(r#"{"summary":"ok"}"#);
        let row = BriefRow::from_brief("t", "B", "ES", &record, "m", 0, 0.0, 7);
        let days_out = row.expires_at - Utc::now();
        assert!(days_out > Duration::days(6) && days_out <= Duration::days(7));
    }

    #[test]
    fn test_cost_is_rounded_to_micros() {
        let record = extract(r#"{"summary":"ok"}"#);
        let row = BriefRow::from_brief("t", "B", "ES", &record, "m", 0, 0.017_000_44, 7);
        assert_eq!(row.research_cost_usd, 0.017);
    }
}
