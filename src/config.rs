//! Runtime configuration for the enrichment pipeline.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Model requested for every batch entry.
const DEFAULT_MODEL: &str = "claude-haiku-4-5";

/// Per-request completion token cap.
const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Tenant whose predictions are enriched.
const DEFAULT_TENANT_ID: &str = "civant_default";

/// How long a brief stays valid before it is re-enriched.
const DEFAULT_BRIEF_TTL_DAYS: i64 = 7;

/// Seconds between poll cycles while waiting for a batch to end.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Errors that can occur while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for the enrichment pipeline.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// API key used for batch submission.
    pub anthropic_api_key: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Model requested for every batch entry and recorded on each brief.
    pub model: String,
    /// Per-request completion token cap.
    pub max_tokens: u32,
    /// Tenant whose predictions are enriched.
    pub tenant_id: String,
    /// How long a brief stays valid before it is re-enriched.
    pub brief_ttl_days: i64,
    /// Delay between poll cycles while waiting for a batch to end.
    pub poll_interval: Duration,
}

impl EnrichConfig {
    /// Load configuration from the environment.
    ///
    /// `ANTHROPIC_API_KEY` and `DATABASE_URL` are required; everything else
    /// has a production default and a `CIVANT_*` override.
    pub fn from_env() -> Result<Self, ConfigError> {
        let anthropic_api_key = env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        Ok(Self {
            anthropic_api_key,
            database_url,
            model: env::var("CIVANT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens: parse_var("CIVANT_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            tenant_id: env::var("CIVANT_TENANT_ID")
                .unwrap_or_else(|_| DEFAULT_TENANT_ID.to_string()),
            brief_ttl_days: parse_var("CIVANT_BRIEF_TTL_DAYS", DEFAULT_BRIEF_TTL_DAYS)?,
            poll_interval: Duration::from_secs(parse_var(
                "CIVANT_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
        })
    }
}

/// Parse an optional environment variable, falling back to a default.
fn parse_var<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_uses_default_when_unset() {
        let value: u32 = parse_var("CIVANT_TEST_UNSET_VARIABLE", 42).expect("default");
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_var_reads_and_trims() {
        env::set_var("CIVANT_TEST_TRIMMED_VARIABLE", " 7 ");
        let value: i64 = parse_var("CIVANT_TEST_TRIMMED_VARIABLE", 0).expect("parsed");
        assert_eq!(value, 7);
        env::remove_var("CIVANT_TEST_TRIMMED_VARIABLE");
    }

    #[test]
    fn test_parse_var_reports_invalid_values() {
        env::set_var("CIVANT_TEST_INVALID_VARIABLE", "not-a-number");
        let result: Result<u32, _> = parse_var("CIVANT_TEST_INVALID_VARIABLE", 0);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        env::remove_var("CIVANT_TEST_INVALID_VARIABLE");
    }
}
