//! Award-history document types.
//!
//! `get_buyer_award_history` assembles a JSON document in the database.
//! Fields are frequently missing or null for sparse buyers, so everything
//! defaults, and monetary figures stay as raw JSON values (the function can
//! emit numerics as strings) until the prompt layer formats them.

use serde::Deserialize;
use serde_json::Value;

/// The full history document for one buyer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwardHistory {
    #[serde(default)]
    pub stats: AwardStats,
    #[serde(default)]
    pub top_suppliers: Vec<TopSupplier>,
    #[serde(default)]
    pub renewal_patterns: Vec<RenewalPattern>,
    #[serde(default)]
    pub recent_contracts: Vec<RecentContract>,
}

impl AwardHistory {
    /// True when there is at least one contract on record.
    pub fn has_contracts(&self) -> bool {
        self.stats.total_contracts > 0
    }
}

/// Aggregate award statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwardStats {
    #[serde(default)]
    pub total_contracts: i64,
    #[serde(default)]
    pub unique_suppliers: i64,
    #[serde(default)]
    pub total_spend: Option<Value>,
    #[serde(default)]
    pub avg_contract_value: Option<Value>,
    #[serde(default)]
    pub max_contract_value: Option<Value>,
    #[serde(default)]
    pub earliest_award: Option<String>,
    #[serde(default)]
    pub latest_award: Option<String>,
    #[serde(default)]
    pub avg_duration_months: Option<Value>,
    #[serde(default)]
    pub framework_count: Option<i64>,
    #[serde(default)]
    pub cpv_clusters: Vec<String>,
}

/// One supplier aggregated across the buyer's awards.
#[derive(Debug, Clone, Deserialize)]
pub struct TopSupplier {
    pub supplier: String,
    #[serde(default)]
    pub contracts: i64,
    #[serde(default)]
    pub total_value: Option<Value>,
    #[serde(default)]
    pub last_award: Option<String>,
}

/// Renewal cadence for one procurement category.
#[derive(Debug, Clone, Deserialize)]
pub struct RenewalPattern {
    pub cpv_cluster: String,
    #[serde(default)]
    pub occurrences: i64,
    #[serde(default)]
    pub avg_duration: Option<Value>,
    #[serde(default)]
    pub avg_value: Option<Value>,
    #[serde(default)]
    pub last_end_date: Option<String>,
}

/// One recent contract award.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentContract {
    #[serde(default)]
    pub value_eur: Option<Value>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub award_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub cpv_primary: Option<String>,
    #[serde(default)]
    pub duration_months: Option<Value>,
}
