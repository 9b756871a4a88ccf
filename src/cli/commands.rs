//! CLI command definitions for civant-enrich.

use clap::Parser;

use crate::config::EnrichConfig;
use crate::pipeline::{EnrichPipeline, IngestSummary, SubmitOptions, SubmitOutcome};

/// Batch buyer enrichment for upcoming procurement predictions.
#[derive(Parser)]
#[command(name = "civant-enrich")]
#[command(about = "Pre-populate buyer intelligence briefs via the Messages Batches API")]
#[command(version)]
#[command(
    long_about = "civant-enrich pre-populates buyer intelligence briefs for upcoming procurement predictions using the Messages Batches API.\n\nExample usage:\n  civant-enrich submit --dry-run\n  civant-enrich submit --include-overdue\n  civant-enrich poll msgbatch_abc123\n  civant-enrich ingest msgbatch_abc123"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Build and submit an enrichment batch for buyers that need briefs.
    Submit(SubmitArgs),

    /// Check the status of a submitted batch.
    Poll(PollArgs),

    /// Download a completed batch and upsert the extracted briefs.
    Ingest(IngestArgs),
}

/// Arguments for `civant-enrich submit`.
#[derive(Parser, Debug)]
pub struct SubmitArgs {
    /// Show what would be submitted without creating a batch.
    #[arg(long)]
    pub dry_run: bool,

    /// Also enrich buyers with overdue predictions.
    #[arg(long)]
    pub include_overdue: bool,

    /// Skip the check for existing unexpired briefs.
    #[arg(long)]
    pub no_cache_check: bool,

    /// Cap the number of buyers submitted.
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for `civant-enrich poll`.
#[derive(Parser, Debug)]
pub struct PollArgs {
    /// Batch id returned at submission.
    pub batch_id: String,

    /// Report once instead of waiting for the batch to end.
    #[arg(long)]
    pub no_wait: bool,
}

/// Arguments for `civant-enrich ingest`.
#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Batch id returned at submission.
    pub batch_id: String,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Execute the parsed command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = EnrichConfig::from_env()?;
    let pipeline = EnrichPipeline::new(config).await?;

    match cli.command {
        Commands::Submit(args) => {
            let outcome = pipeline
                .submit(SubmitOptions {
                    dry_run: args.dry_run,
                    include_overdue: args.include_overdue,
                    skip_cache_check: args.no_cache_check,
                    limit: args.limit,
                })
                .await?;
            print_submit_outcome(&outcome);
        }
        Commands::Poll(args) => {
            let batch = pipeline.poll(&args.batch_id, !args.no_wait).await?;
            let counts = batch.request_counts;
            println!("\n=== Batch {} ===", batch.id);
            println!("Status:     {}", batch.processing_status);
            println!("Processing: {}", counts.processing);
            println!("Succeeded:  {}", counts.succeeded);
            println!("Errored:    {}", counts.errored);
            println!("Canceled:   {}", counts.canceled);
            println!("Expired:    {}", counts.expired);
        }
        Commands::Ingest(args) => {
            let summary = pipeline.ingest(&args.batch_id).await?;
            print_ingest_summary(&summary);
        }
    }

    Ok(())
}

fn print_submit_outcome(outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::NothingToDo => {
            println!("All buyers already have valid briefs. Nothing to do.");
        }
        SubmitOutcome::DryRun { requests, estimate } => {
            println!("Dry run: {requests} requests would be submitted");
            println!(
                "Estimated cost: ~${:.2} (web search ${:.2} + tokens ~${:.2})",
                estimate.total_usd(),
                estimate.web_search_usd,
                estimate.tokens_usd
            );
        }
        SubmitOutcome::Submitted {
            batch_id,
            requests,
            map_path,
        } => {
            println!("Batch {batch_id} submitted with {requests} requests");
            println!("Id map saved to {map_path}");
            println!();
            println!("Next steps:");
            println!("  civant-enrich poll {batch_id}");
            println!("  civant-enrich ingest {batch_id}");
        }
    }
}

fn print_ingest_summary(summary: &IngestSummary) {
    println!("\n=== Batch enrichment complete ===");
    println!("Succeeded:    {}", summary.succeeded);
    println!("Errored:      {}", summary.errored);
    println!("Skipped:      {}", summary.skipped);
    println!("Upserted:     {}", summary.upserted);
    println!("Total tokens: {}", summary.total_tokens);
    println!("Total cost:   ${:.2}", summary.total_cost_usd);
    if let Some(scores) = summary.score_stats {
        println!("Avg opportunity score: {:.1}", scores.average);
        println!("Score range:           {}-{}", scores.min, scores.max);
    }
}
