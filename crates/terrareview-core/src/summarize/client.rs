//! OpenAI-compatible chat completions client.
//!
//! Sends one non-streaming completion request per summary. Sampling
//! parameters are fixed; only the endpoint, model and timeout are
//! configurable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use crate::sniff::truncate_chars;

use super::errors::SummarizeError;
use super::trait_def::Summarizer;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default endpoint base URL (NVIDIA's hosted OpenAI-compatible API).
pub const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "nvidia/llama-3.1-nemotron-nano-8b-v1";

/// Sampling temperature for every request.
pub const TEMPERATURE: f32 = 0.3;

/// Output length cap, in tokens.
pub const MAX_TOKENS: u32 = 400;

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default total request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How much of a non-2xx response body is kept in [`SummarizeError::HttpError`].
pub const MAX_ERROR_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Endpoint settings for [`ChatCompletionsClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizerConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Total request timeout.
    pub request_timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`Summarizer`] backed by a remote chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: HttpClient,
    config: SummarizerConfig,
}

impl ChatCompletionsClient {
    /// Build a client. Does not check connectivity; that happens on the
    /// first request.
    pub fn new(config: SummarizerConfig) -> Result<Self, SummarizeError> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SummarizeError::Config {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    /// Full URL of the completions endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn transport_error(&self, endpoint: &str, err: reqwest::Error) -> SummarizeError {
        if err.is_timeout() {
            SummarizeError::Timeout {
                duration_secs: self.config.request_timeout.as_secs(),
            }
        } else {
            SummarizeError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Summarizer for ChatCompletionsClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str, credential: &str) -> Result<String, SummarizeError> {
        let url = self.endpoint();
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        // Request metadata only; the credential and prompt stay out of logs.
        tracing::info!(
            url = %url,
            model = %body.model,
            prompt_chars = prompt.chars().count(),
            max_tokens = body.max_tokens,
            "sending summarization request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(http_error(status.as_u16(), &body_text));
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        parse_completion(&body_text)
    }
}

/// Error for a non-2xx reply, keeping only the start of the body.
fn http_error(status: u16, body: &str) -> SummarizeError {
    SummarizeError::HttpError {
        status,
        body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
    }
}

/// Extract the first choice's message content from a completion body.
pub fn parse_completion(body: &str) -> Result<String, SummarizeError> {
    let resp: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| SummarizeError::MalformedResponse {
            reason: format!("failed to parse completion response: {e}"),
        })?;

    resp.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| SummarizeError::MalformedResponse {
            reason: "response contained no message content".to_string(),
        })
}
