//! Submit / poll / ingest orchestration.
//!
//! The pipeline owns no extraction logic and no SQL; it sequences the
//! storage layer, the prompt builder, the batch client and the extraction
//! engine, and turns per-item failures into counted, logged outcomes
//! instead of aborts.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::EnrichConfig;
use crate::error::BatchError;
use crate::extract;
use crate::llm::batches::{
    AnthropicBatchClient, BatchOutcome, BatchRequest, BatchSubmitter, Message, MessageBatch,
    MessageParams, ToolSpec,
};
use crate::llm::cost::{result_cost_usd, CostEstimate};
use crate::prompts;
use crate::storage::{AwardHistory, BriefRow, Buyer, Database, DatabaseError};

use super::idmap::IdMap;

/// Errors that can occur while orchestrating a flow.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Batch API error: {0}")]
    Batch(#[from] BatchError),

    #[error("Id map for batch '{batch_id}' not found at {path}; run ingest from the directory that submitted the batch")]
    IdMapMissing { batch_id: String, path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for a submission run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitOptions {
    /// Report what would be submitted without creating a batch.
    pub dry_run: bool,
    /// Also enrich buyers with overdue predictions.
    pub include_overdue: bool,
    /// Skip the check for existing unexpired briefs.
    pub skip_cache_check: bool,
    /// Cap the number of buyers submitted.
    pub limit: Option<usize>,
}

/// Outcome of a submission run.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Every buyer already has a valid brief; no batch was created.
    NothingToDo,
    /// Dry run: reported what would have been submitted.
    DryRun {
        requests: usize,
        estimate: CostEstimate,
    },
    /// Batch created and id map persisted.
    Submitted {
        batch_id: String,
        requests: usize,
        map_path: String,
    },
}

/// Summary of an ingest run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    pub succeeded: usize,
    pub errored: usize,
    pub skipped: usize,
    pub upserted: usize,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub score_stats: Option<ScoreStats>,
}

/// Distribution of the opportunity scores that were present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreStats {
    pub average: f64,
    pub min: i64,
    pub max: i64,
}

impl ScoreStats {
    /// Stats over the scores that are present; `None` when none are.
    pub fn from_scores(scores: &[i64]) -> Option<Self> {
        let (&min, &max) = (scores.iter().min()?, scores.iter().max()?);
        let average = scores.iter().sum::<i64>() as f64 / scores.len() as f64;
        Some(Self { average, min, max })
    }
}

/// Orchestrates the submit, poll and ingest flows.
pub struct EnrichPipeline<S: BatchSubmitter = AnthropicBatchClient> {
    config: EnrichConfig,
    db: Database,
    client: S,
}

impl EnrichPipeline<AnthropicBatchClient> {
    /// Connect to Postgres and build the API client from configuration.
    pub async fn new(config: EnrichConfig) -> Result<Self, PipelineError> {
        let db = Database::connect(&config.database_url, &config.tenant_id).await?;
        let client = AnthropicBatchClient::new(config.anthropic_api_key.clone());
        Ok(Self::with_parts(config, db, client))
    }
}

impl<S: BatchSubmitter> EnrichPipeline<S> {
    /// Assemble a pipeline from already-built parts.
    pub fn with_parts(config: EnrichConfig, db: Database, client: S) -> Self {
        Self { config, db, client }
    }

    /// Build and submit an enrichment batch.
    pub async fn submit(&self, opts: SubmitOptions) -> Result<SubmitOutcome, PipelineError> {
        info!("Fetching unique buyers from predictions");
        let mut buyers = self.db.fetch_buyers(opts.include_overdue).await?;
        info!(count = buyers.len(), "Found buyer/country pairs");

        if !opts.skip_cache_check {
            buyers = self.db.filter_already_cached(buyers).await?;
        }
        if let Some(limit) = opts.limit {
            buyers.truncate(limit);
            info!(count = buyers.len(), "Limited buyer count");
        }
        if buyers.is_empty() {
            info!("All buyers already have valid briefs, nothing to do");
            return Ok(SubmitOutcome::NothingToDo);
        }

        info!(count = buyers.len(), "Fetching award history");
        let mut with_history: Vec<(Buyer, Option<AwardHistory>)> =
            Vec::with_capacity(buyers.len());
        for buyer in buyers {
            let history = self
                .db
                .fetch_award_history(&buyer.buyer_name, &buyer.country)
                .await;
            with_history.push((buyer, history));
        }
        let with_data = with_history
            .iter()
            .filter(|(_, h)| h.as_ref().is_some_and(AwardHistory::has_contracts))
            .count();
        info!(
            with_data,
            total = with_history.len(),
            "Buyers with award history data"
        );

        let (requests, id_map) = build_requests(&self.config, &with_history);

        let mut by_country: BTreeMap<&str, usize> = BTreeMap::new();
        for (buyer, _) in &with_history {
            *by_country.entry(buyer.country.as_str()).or_insert(0) += 1;
        }
        for (country, count) in &by_country {
            info!(country, requests = count, "Queued");
        }

        let estimate = CostEstimate::for_requests(requests.len());
        info!(
            requests = requests.len(),
            estimated_cost_usd = format!("{:.2}", estimate.total_usd()),
            "Built batch requests"
        );

        if opts.dry_run {
            return Ok(SubmitOutcome::DryRun {
                requests: requests.len(),
                estimate,
            });
        }

        let request_count = requests.len();
        let batch = self.client.create_batch(requests).await?;
        info!(batch_id = %batch.id, status = %batch.processing_status, "Batch created");

        let map_path = IdMap::path_for(&batch.id);
        id_map.save(&map_path)?;
        info!(path = %map_path.display(), entries = id_map.len(), "Id map saved");

        Ok(SubmitOutcome::Submitted {
            batch_id: batch.id,
            requests: request_count,
            map_path: map_path.display().to_string(),
        })
    }

    /// Check batch status, optionally polling until it ends.
    pub async fn poll(&self, batch_id: &str, wait: bool) -> Result<MessageBatch, PipelineError> {
        let mut batch = self.client.retrieve_batch(batch_id).await?;
        log_counts(&batch);
        if !wait {
            return Ok(batch);
        }
        while !batch.has_ended() {
            sleep(self.config.poll_interval).await;
            batch = self.client.retrieve_batch(batch_id).await?;
            log_counts(&batch);
        }
        info!(batch_id, "Batch complete");
        Ok(batch)
    }

    /// Download results, extract briefs and upsert them.
    pub async fn ingest(&self, batch_id: &str) -> Result<IngestSummary, PipelineError> {
        let map_path = IdMap::path_for(batch_id);
        let id_map = match IdMap::load(&map_path) {
            Ok(map) => map,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::IdMapMissing {
                    batch_id: batch_id.to_string(),
                    path: map_path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        info!(entries = id_map.len(), path = %map_path.display(), "Loaded id map");

        let results = self.client.batch_results(batch_id).await?;
        info!(results = results.len(), "Downloaded batch results");

        let mut summary = IngestSummary::default();
        let mut rows = Vec::new();
        let mut scores = Vec::new();

        for entry in results {
            let message = match entry.result {
                BatchOutcome::Succeeded { message } => message,
                BatchOutcome::Errored { error } => {
                    summary.errored += 1;
                    error!(custom_id = %entry.custom_id, ?error, "Batch entry errored");
                    continue;
                }
                BatchOutcome::Canceled | BatchOutcome::Expired => {
                    summary.skipped += 1;
                    continue;
                }
            };
            let Some(buyer) = id_map.get(&entry.custom_id) else {
                warn!(custom_id = %entry.custom_id, "No id map entry for result");
                summary.skipped += 1;
                continue;
            };

            let raw_text = message.text();
            let extraction = extract::extract_detailed(&raw_text);
            if !extraction.tier.is_parsed() {
                warn!(
                    custom_id = %entry.custom_id,
                    buyer = %buyer.buyer_name,
                    "Response did not parse; brief reconstructed field-by-field"
                );
            }

            let usage = &message.usage;
            let cost = result_cost_usd(
                usage.input_tokens,
                usage.output_tokens,
                usage.web_searches(),
            );

            let row = BriefRow::from_brief(
                &self.config.tenant_id,
                &buyer.buyer_name,
                &buyer.country,
                &extraction.record,
                &self.config.model,
                usage.total_tokens(),
                cost,
                self.config.brief_ttl_days,
            );

            summary.total_tokens += usage.total_tokens();
            summary.total_cost_usd += cost;
            if let Some(score) = row.opportunity_score {
                scores.push(score);
            }
            rows.push(row);
            summary.succeeded += 1;
        }

        info!(briefs = rows.len(), "Upserting briefs");
        summary.upserted = self.db.upsert_briefs(&rows).await?;
        summary.score_stats = ScoreStats::from_scores(&scores);
        Ok(summary)
    }
}

/// Build the batch request list and the id map that survives to ingestion.
fn build_requests(
    config: &EnrichConfig,
    buyers: &[(Buyer, Option<AwardHistory>)],
) -> (Vec<BatchRequest>, IdMap) {
    let mut requests = Vec::with_capacity(buyers.len());
    let mut id_map = IdMap::new();

    for (idx, (buyer, history)) in buyers.iter().enumerate() {
        let prompts = prompts::build_prompts(&buyer.buyer_name, &buyer.country, history.as_ref(), None);
        // The API limits custom_id to a short safe alphabet, so the buyer
        // name stays in the id map instead.
        let custom_id = format!("{}_{:04}", buyer.country, idx);
        id_map.insert(custom_id.clone(), buyer.clone());

        requests.push(BatchRequest {
            custom_id,
            params: MessageParams {
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                system: prompts.system,
                messages: vec![Message::user(prompts.user)],
                tools: vec![ToolSpec::web_search()],
            },
        });
    }

    (requests, id_map)
}

fn log_counts(batch: &MessageBatch) {
    let counts = &batch.request_counts;
    info!(
        batch_id = %batch.id,
        status = %batch.processing_status,
        processing = counts.processing,
        succeeded = counts.succeeded,
        errored = counts.errored,
        canceled = counts.canceled,
        expired = counts.expired,
        "Batch status"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> EnrichConfig {
        EnrichConfig {
            anthropic_api_key: "test-key".to_string(),
            database_url: "postgres://localhost/test".to_string(),
            model: "claude-haiku-4-5".to_string(),
            max_tokens: 1500,
            tenant_id: "civant_default".to_string(),
            brief_ttl_days: 7,
            poll_interval: Duration::from_secs(60),
        }
    }

    fn buyer(name: &str, country: &str) -> Buyer {
        Buyer {
            buyer_name: name.to_string(),
            country: country.to_string(),
        }
    }

    #[test]
    fn test_build_requests_assigns_indexed_custom_ids() {
        let config = test_config();
        let buyers = vec![
            (buyer("Madrid City Council", "ES"), None),
            (buyer("Ville de Lyon", "FR"), None),
        ];
        let (requests, id_map) = build_requests(&config, &buyers);

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].custom_id, "ES_0000");
        assert_eq!(requests[1].custom_id, "FR_0001");
        assert_eq!(
            id_map.get("ES_0000").map(|b| b.buyer_name.as_str()),
            Some("Madrid City Council")
        );
        assert_eq!(
            id_map.get("FR_0001").map(|b| b.buyer_name.as_str()),
            Some("Ville de Lyon")
        );
    }

    #[test]
    fn test_build_requests_carries_model_and_web_search_tool() {
        let config = test_config();
        let buyers = vec![(buyer("B", "IE"), None)];
        let (requests, _) = build_requests(&config, &buyers);

        let params = &requests[0].params;
        assert_eq!(params.model, "claude-haiku-4-5");
        assert_eq!(params.max_tokens, 1500);
        assert_eq!(params.tools.len(), 1);
        assert_eq!(params.tools[0].name, "web_search");
        assert_eq!(params.messages.len(), 1);
        assert!(params.messages[0].content.contains("Buyer: B"));
        assert!(params.system.contains("Civant Agent"));
    }

    #[test]
    fn test_score_stats() {
        let stats = ScoreStats::from_scores(&[60, 80, 70]).expect("stats");
        assert_eq!(stats.min, 60);
        assert_eq!(stats.max, 80);
        assert!((stats.average - 70.0).abs() < 1e-9);

        assert!(ScoreStats::from_scores(&[]).is_none());
    }

    #[test]
    fn test_submit_options_default_to_plain_run() {
        let opts = SubmitOptions::default();
        assert!(!opts.dry_run);
        assert!(!opts.include_overdue);
        assert!(!opts.skip_cache_check);
        assert!(opts.limit.is_none());
    }
}
