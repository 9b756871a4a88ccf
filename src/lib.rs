//! civant-enrich: batch buyer intelligence enrichment.
//!
//! Pre-populates buyer research briefs for upcoming procurement predictions
//! using the Messages Batches API, with a resilient extraction engine for
//! pulling the structured brief out of whatever text the model actually
//! returned.

// Core modules
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod storage;

// Re-export commonly used types
pub use config::{ConfigError, EnrichConfig};
pub use error::BatchError;
pub use extract::{extract, extract_detailed, ExtractedRecord, Extraction, ExtractionTier};
