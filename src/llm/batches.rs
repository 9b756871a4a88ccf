//! Client for the Anthropic Messages Batches API.
//!
//! Submission, status retrieval and result download for message batches.
//! The pipeline only ever talks to the [`BatchSubmitter`] trait, so tests
//! can drive the flows without the network.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BatchError;

/// Production API endpoint.
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Version header required on every request.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A message in a batch request conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (e.g., "user", "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A server tool enabled for a batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Versioned tool type identifier.
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Tool name.
    pub name: String,
}

impl ToolSpec {
    /// The hosted web-search tool used for current buyer intelligence.
    pub fn web_search() -> Self {
        Self {
            tool_type: "web_search_20250305".to_string(),
            name: "web_search".to_string(),
        }
    }
}

/// Parameters for one message creation inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageParams {
    /// Model identifier.
    pub model: String,
    /// Completion token cap.
    pub max_tokens: u32,
    /// System prompt.
    pub system: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Server tools available to the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

/// One entry in a batch submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Caller-chosen identifier echoed back with the result.
    pub custom_id: String,
    /// The message creation parameters.
    pub params: MessageParams,
}

/// Per-outcome counts reported for a batch.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RequestCounts {
    #[serde(default)]
    pub processing: u64,
    #[serde(default)]
    pub succeeded: u64,
    #[serde(default)]
    pub errored: u64,
    #[serde(default)]
    pub canceled: u64,
    #[serde(default)]
    pub expired: u64,
}

/// A message batch as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageBatch {
    /// Batch identifier (`msgbatch_...`).
    pub id: String,
    /// `in_progress`, `canceling` or `ended`.
    pub processing_status: String,
    #[serde(default)]
    pub request_counts: RequestCounts,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Download URL for the results file, present once processing ended.
    #[serde(default)]
    pub results_url: Option<String>,
}

impl MessageBatch {
    /// True once processing has ended and results can be downloaded.
    pub fn has_ended(&self) -> bool {
        self.processing_status == "ended"
    }
}

/// Server tool usage within one response.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ServerToolUsage {
    #[serde(default)]
    pub web_search_requests: u64,
}

/// Token usage for one response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub server_tool_use: Option<ServerToolUsage>,
}

impl MessageUsage {
    /// Input plus output tokens.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Web searches performed while producing the response.
    pub fn web_searches(&self) -> u64 {
        self.server_tool_use
            .map(|u| u.web_search_requests)
            .unwrap_or(0)
    }
}

/// One content block of a response message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Generated text.
    Text { text: String },
    /// Tool-use, search-result and other block types; carried but not
    /// interpreted.
    #[serde(other)]
    Other,
}

/// A completed response message from one batch entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: MessageUsage,
    #[serde(default)]
    pub model: Option<String>,
}

impl BatchMessage {
    /// All text blocks joined with newlines; non-text blocks are skipped.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcome of one batch entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The request completed and produced a message.
    Succeeded { message: BatchMessage },
    /// The request failed; the error document is passed through verbatim.
    Errored {
        #[serde(default)]
        error: Value,
    },
    /// The batch was canceled before this request ran.
    Canceled,
    /// The batch expired before this request ran.
    Expired,
}

/// One line of a batch results file.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResultEntry {
    pub custom_id: String,
    pub result: BatchOutcome,
}

/// Trait for batch submission backends.
#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    /// Submit a new batch of message requests.
    async fn create_batch(&self, requests: Vec<BatchRequest>) -> Result<MessageBatch, BatchError>;

    /// Fetch the current state of a batch.
    async fn retrieve_batch(&self, batch_id: &str) -> Result<MessageBatch, BatchError>;

    /// Download the results of an ended batch.
    async fn batch_results(&self, batch_id: &str) -> Result<Vec<BatchResultEntry>, BatchError>;
}

/// HTTP client for the Messages Batches API.
pub struct AnthropicBatchClient {
    /// Base URL for the API.
    api_base: String,
    /// API key sent in the `x-api-key` header.
    api_key: String,
    /// HTTP client for making API requests.
    http_client: Client,
}

impl AnthropicBatchClient {
    /// Create a client against the production endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_api_base(DEFAULT_API_BASE.to_string(), api_key)
    }

    /// Create a client against an explicit endpoint.
    pub fn with_api_base(api_base: String, api_key: String) -> Self {
        Self {
            api_base,
            api_key,
            http_client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Create a client from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, BatchError> {
        let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| BatchError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }

    /// Turn a non-success response into a typed error.
    async fn error_from_response(response: reqwest::Response) -> BatchError {
        let status_code = response.status().as_u16();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());

        if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
            if status_code == 429 {
                return BatchError::RateLimited(error_response.error.message);
            }
            return BatchError::ApiError {
                code: status_code,
                message: error_response.error.message,
            };
        }

        BatchError::ApiError {
            code: status_code,
            message: error_text,
        }
    }
}

/// Internal body for batch creation.
#[derive(Debug, Serialize)]
struct CreateBatchBody {
    requests: Vec<BatchRequest>,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Deserialize)]
#[allow(dead_code)] // Fields kept for complete API error deserialization
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

#[async_trait]
impl BatchSubmitter for AnthropicBatchClient {
    async fn create_batch(&self, requests: Vec<BatchRequest>) -> Result<MessageBatch, BatchError> {
        let url = format!("{}/v1/messages/batches", self.api_base);
        let response = self
            .post(&url)
            .json(&CreateBatchBody { requests })
            .send()
            .await
            .map_err(|e| BatchError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| BatchError::ParseError(format!("Failed to parse batch: {e}")))
    }

    async fn retrieve_batch(&self, batch_id: &str) -> Result<MessageBatch, BatchError> {
        let url = format!("{}/v1/messages/batches/{}", self.api_base, batch_id);
        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| BatchError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| BatchError::ParseError(format!("Failed to parse batch: {e}")))
    }

    async fn batch_results(&self, batch_id: &str) -> Result<Vec<BatchResultEntry>, BatchError> {
        let batch = self.retrieve_batch(batch_id).await?;
        let results_url = batch.results_url.ok_or_else(|| BatchError::ResultsNotReady {
            batch_id: batch_id.to_string(),
            status: batch.processing_status.clone(),
        })?;

        let response = self
            .get(&results_url)
            .send()
            .await
            .map_err(|e| BatchError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| BatchError::RequestFailed(e.to_string()))?;

        parse_results_jsonl(&body)
    }
}

/// Parse the newline-delimited results file.
fn parse_results_jsonl(body: &str) -> Result<Vec<BatchResultEntry>, BatchError> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| BatchError::ParseError(format!("Bad results line: {e}")))
        })
        .collect()
}
