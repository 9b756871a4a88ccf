//! LLM integration: the Messages Batches client and cost accounting.
//!
//! Enrichment never calls the synchronous messages endpoint; every request
//! rides in a batch for the discount, gets polled until the batch ends, and
//! is priced from the usage reported with each result.

pub mod batches;
pub mod cost;

pub use batches::{
    AnthropicBatchClient, BatchMessage, BatchOutcome, BatchRequest, BatchResultEntry,
    BatchSubmitter, ContentBlock, Message, MessageBatch, MessageParams, MessageUsage,
    RequestCounts, ServerToolUsage, ToolSpec,
};
pub use cost::{result_cost_usd, round_to_micros, CostEstimate};
