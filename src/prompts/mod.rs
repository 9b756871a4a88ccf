//! Prompt construction for buyer enrichment requests.
//!
//! One buyer in, one system prompt + user message pair out. The system
//! prompt pins the exact JSON response contract the extraction engine
//! recognizes; the user message carries the canonical award-history block
//! when the buyer has one.

use serde_json::Value;

use crate::storage::{AwardHistory, RecentContract, RenewalPattern, TopSupplier};

/// How many recent contracts ride along in the user message.
const RECENT_CONTRACTS_SHOWN: usize = 5;

/// System prompt; `{history_note}` is filled per buyer.
const SYSTEM_TEMPLATE: &str = r#"You are Civant Agent, a procurement intelligence analyst with access to both historical contract award data and web research. Your job is to produce an actionable intelligence brief for a company deciding whether to pursue a predicted procurement opportunity.

You have TWO information sources:
1. CANONICAL DATA: Real contract award history from official procurement portals (provided below). This is factual and verified. Analyze it for: renewal cycles, spend trends, incumbent suppliers, typical contract durations, category patterns, and budget trajectory.
2. WEB RESEARCH: Use your web search to find CURRENT intelligence: recent news, leadership changes, budget announcements, organizational restructuring, upcoming projects, and policy shifts.

COMBINE both sources into a single coherent brief. Lead with data-backed insights (patterns from the award history), then layer on web intelligence. If the award history shows clear patterns (e.g. "renews IT services every 3 years at ~200k"), state them explicitly.
{history_note}
Respond ONLY in JSON. Use this EXACT structure (do NOT add extra keys, do NOT nest differently):
{"summary":"3-4 sentence executive summary","procurement_patterns":{"renewal_cycle":"description","spend_trend":"increasing|stable|decreasing|insufficient_data","typical_value_range":"e.g. 50k-200k","preferred_categories":["categories"],"notes":"other patterns"},"incumbent_landscape":{"known_suppliers":["suppliers"],"dominant_supplier":"name or null","contract_notes":"history"},"organizational_context":{"type":"municipality|health_authority|university|ministry|agency|school|other","leadership":"name","recent_changes":"changes","size_indicator":"small|medium|large"},"risk_factors":["risks"],"timing_insight":"when to engage","opportunity_score":75,"opportunity_reasoning":"why this score based on data","intent_confidence":"high|medium|low","intent_reasoning":"why this confidence level","sources":[{"url":"url","title":"title","relevance":"why"}]}

SCORING RULES for opportunity_score (integer 0-100):
- 80-100: Clear renewal cycle approaching, strong spend history, open competition
- 60-79: Good award history, moderate patterns, some incumbent lock-in but winnable
- 40-59: Limited data or mixed signals, worth monitoring
- 20-39: Sparse history, single low-value contract, or locked-in incumbent
- 0-19: No meaningful data, speculative only

INTENT CONFIDENCE based on DATA quality:
- high: 3+ contracts with clear renewal cadence and approaching end date
- medium: 1-2 contracts or irregular renewal pattern
- low: No canonical award data, relying on web research alone

CRITICAL: Return ONLY the raw JSON object. No markdown, no explanation, no preamble. Start with { end with }."#;

/// Note appended when no award history was found.
const NO_HISTORY_NOTE: &str =
    "\nNOTE: No historical award data was found for this buyer. Rely on web research alone but note the data gap.";

/// System and user message for one batch entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Build the prompts for one buyer.
///
/// Deterministic: the same inputs always produce the same strings.
pub fn build_prompts(
    buyer_name: &str,
    country: &str,
    award_history: Option<&AwardHistory>,
    category: Option<&str>,
) -> PromptPair {
    let has_history = award_history.is_some_and(AwardHistory::has_contracts);

    let history_note = if has_history { "" } else { NO_HISTORY_NOTE };
    let system = SYSTEM_TEMPLATE.replace("{history_note}", history_note);

    let mut parts: Vec<String> = vec![
        "Research this public sector buyer for a predicted procurement opportunity:".to_string(),
        format!("Buyer: {buyer_name}"),
        format!("Country: {}", country_label(country)),
    ];
    if let Some(category) = category {
        parts.push(format!("Sector: {category}"));
    }

    if has_history {
        let history = award_history.expect("has_history implies history");
        push_canonical_data(&mut parts, history);
    } else {
        parts.push(String::new());
        parts.push("No historical award data found for this buyer in our database.".to_string());
    }

    parts.push(String::new());
    parts.push(
        "Now use web search to find current intelligence about this buyer, \
         then combine with the data above to produce the intelligence brief in JSON format."
            .to_string(),
    );

    PromptPair {
        system,
        user: parts.join("\n"),
    }
}

/// Human-readable labels for the covered markets.
fn country_label(country: &str) -> &str {
    match country {
        "ES" => "Spain",
        "FR" => "France",
        "IE" => "Ireland",
        other => other,
    }
}

/// Append the canonical award-data block.
fn push_canonical_data(parts: &mut Vec<String>, history: &AwardHistory) {
    let stats = &history.stats;

    parts.push(String::new());
    parts.push("=== CANONICAL AWARD DATA (from official procurement portals) ===".to_string());
    parts.push(format!(
        "Total contracts on record: {}",
        stats.total_contracts
    ));
    parts.push(format!("Unique suppliers: {}", stats.unique_suppliers));
    parts.push(format!("Total spend: EUR {}", eur(stats.total_spend.as_ref())));
    parts.push(format!(
        "Average contract value: EUR {}",
        eur(stats.avg_contract_value.as_ref())
    ));
    parts.push(format!(
        "Max contract value: EUR {}",
        eur(stats.max_contract_value.as_ref())
    ));
    parts.push(format!(
        "Award history span: {} to {}",
        stats.earliest_award.as_deref().unwrap_or("?"),
        stats.latest_award.as_deref().unwrap_or("?")
    ));
    parts.push(format!(
        "Average contract duration: {} months",
        value_or(stats.avg_duration_months.as_ref(), "?")
    ));
    parts.push(format!(
        "Framework agreements: {}",
        stats.framework_count.unwrap_or(0)
    ));
    if !stats.cpv_clusters.is_empty() {
        parts.push(format!(
            "Procurement categories: {}",
            stats.cpv_clusters.join(", ")
        ));
    }

    if !history.top_suppliers.is_empty() {
        parts.push(String::new());
        parts.push("Top suppliers:".to_string());
        for supplier in &history.top_suppliers {
            parts.push(top_supplier_line(supplier));
        }
    }

    if !history.renewal_patterns.is_empty() {
        parts.push(String::new());
        parts.push("Renewal patterns by category:".to_string());
        for pattern in &history.renewal_patterns {
            parts.push(renewal_pattern_line(pattern));
        }
    }

    if !history.recent_contracts.is_empty() {
        parts.push(String::new());
        parts.push("Most recent contracts:".to_string());
        for contract in history.recent_contracts.iter().take(RECENT_CONTRACTS_SHOWN) {
            parts.push(recent_contract_line(contract));
        }
    }

    parts.push(String::new());
    parts.push("=== END CANONICAL DATA ===".to_string());
}

fn top_supplier_line(supplier: &TopSupplier) -> String {
    format!(
        "  - {}: {} contracts, EUR {}, last award {}",
        supplier.supplier,
        supplier.contracts,
        eur(supplier.total_value.as_ref()),
        supplier.last_award.as_deref().unwrap_or("?")
    )
}

fn renewal_pattern_line(pattern: &RenewalPattern) -> String {
    format!(
        "  - {}: {} contracts, avg duration {} months, avg value EUR {}, last end date {}",
        pattern.cpv_cluster,
        pattern.occurrences,
        value_or(pattern.avg_duration.as_ref(), "?"),
        eur(pattern.avg_value.as_ref()),
        pattern.last_end_date.as_deref().unwrap_or("unknown")
    )
}

fn recent_contract_line(contract: &RecentContract) -> String {
    format!(
        "  - EUR {} | {} | awarded {} | ends {} | CPV {} | {} months",
        eur(contract.value_eur.as_ref()),
        contract.supplier.as_deref().unwrap_or("unknown supplier"),
        contract.award_date.as_deref().unwrap_or("?"),
        contract.end_date.as_deref().unwrap_or("unknown"),
        contract.cpv_primary.as_deref().unwrap_or("n/a"),
        value_or(contract.duration_months.as_ref(), "?")
    )
}

/// Format a JSON money figure as a whole euro amount with thousands
/// separators. The database function may emit numerics as strings.
fn eur(value: Option<&Value>) -> String {
    group_thousands(numeric(value) as i64)
}

/// Coerce a JSON number-or-string to f64, defaulting to zero.
fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Render a JSON number-or-string verbatim, with a fallback when absent.
fn value_or(value: Option<&Value>, fallback: &str) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => fallback.to_string(),
    }
}

/// Group an integer into comma-separated thousands.
fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
