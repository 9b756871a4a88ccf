//! Cost accounting for batch enrichment runs.
//!
//! Two concerns: pricing completed responses from their reported usage, and
//! projecting a rough cost before a batch is submitted so dry runs can show
//! what a submission would spend.

/// Dollars per million input tokens, with the batch discount applied.
const BATCH_INPUT_PER_MTOK: f64 = 0.40;

/// Dollars per million output tokens, with the batch discount applied.
const BATCH_OUTPUT_PER_MTOK: f64 = 2.00;

/// Flat price per hosted web search.
const WEB_SEARCH_COST_USD: f64 = 0.01;

/// Typical token spend per request, used only for pre-submission estimates.
const EST_TOKENS_PER_REQUEST_USD: f64 = 0.0025;

/// Cost of one completed response, from its reported usage.
pub fn result_cost_usd(input_tokens: u64, output_tokens: u64, web_searches: u64) -> f64 {
    let token_cost = (input_tokens as f64 * BATCH_INPUT_PER_MTOK
        + output_tokens as f64 * BATCH_OUTPUT_PER_MTOK)
        / 1_000_000.0;
    token_cost + web_searches as f64 * WEB_SEARCH_COST_USD
}

/// Round a dollar amount to the 6 decimal places stored with each brief.
pub fn round_to_micros(cost_usd: f64) -> f64 {
    (cost_usd * 1_000_000.0).round() / 1_000_000.0
}

/// Rough cost projection for a submission, shown before any money is spent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    /// Projected web-search spend.
    pub web_search_usd: f64,
    /// Projected token spend.
    pub tokens_usd: f64,
}

impl CostEstimate {
    /// Estimate for a batch of `count` requests, assuming one web search
    /// and typical token usage each.
    pub fn for_requests(count: usize) -> Self {
        Self {
            web_search_usd: count as f64 * WEB_SEARCH_COST_USD,
            tokens_usd: count as f64 * EST_TOKENS_PER_REQUEST_USD,
        }
    }

    /// Combined projection.
    pub fn total_usd(&self) -> f64 {
        self.web_search_usd + self.tokens_usd
    }
}
