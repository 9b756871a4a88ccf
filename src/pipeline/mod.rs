//! Batch enrichment orchestration.
//!
//! Three flows over the same parts:
//!
//! 1. **Submit**: fetch buyers needing briefs, drop the already-cached ones,
//!    attach award history, build prompts and batch requests, submit, and
//!    persist the custom_id → buyer map for later ingestion.
//! 2. **Poll**: report batch progress, optionally until processing ends.
//! 3. **Ingest**: download results, run each response through the extraction
//!    engine, price it from its usage, and upsert the finished briefs.

pub mod idmap;
pub mod orchestrator;

pub use idmap::IdMap;
pub use orchestrator::{
    EnrichPipeline, IngestSummary, PipelineError, ScoreStats, SubmitOptions, SubmitOutcome,
};
