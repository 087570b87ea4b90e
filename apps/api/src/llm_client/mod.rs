/// LLM Client — the single point of entry for chat-completion API calls.
///
/// Speaks the OpenAI-compatible `/chat/completions` dialect (DeepSeek by default).
/// No other module may call the completion API directly; handlers go through
/// the `ChatCompletion` trait carried in `AppState`.
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
    /// True when the failure that ended the call was a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            LlmError::Timeout => true,
            LlmError::RetriesExhausted { last, .. } => last.is_timeout(),
            _ => false,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            LlmError::Timeout | LlmError::Http(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Http(e)
        }
    }
}

/// Result of the connectivity probe against the completion API.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub reachable: bool,
    pub status: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Seam between the HTTP handlers and the remote model.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Sends a system + user message pair and returns the assistant text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;

    /// Single-attempt reachability check. Never retries.
    async fn probe(&self) -> ProbeReport;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Everything the client needs, decoupled from env parsing.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub completions_url: String,
    pub models_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Budget for one `complete` call, retries and backoff included.
    pub total_timeout: Duration,
    pub max_retries: u32,
    pub retry_base: Duration,
}

impl LlmSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            completions_url: config.completions_url(),
            models_url: config.models_url(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            total_timeout: Duration::from_secs(config.total_timeout_secs),
            max_retries: config.max_retries.max(1),
            retry_base: Duration::from_millis(config.retry_base_ms),
        }
    }
}

/// reqwest-backed completion client with bounded retries and exponential backoff.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(LlmError::Http)?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Delay before attempt `attempt` (1-based retry index): base, 2×base, 4×base…
    fn backoff(&self, attempt: u32) -> Duration {
        self.settings
            .retry_base
            .saturating_mul(1u32 << (attempt - 1).min(16))
    }

    async fn attempt(&self, body: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.settings.completions_url)
            .bearer_auth(&self.settings.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    async fn complete_with_retries(&self, body: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let attempts = self.settings.max_retries;
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let started = Instant::now();
            match self.attempt(body).await {
                Ok(content) => {
                    debug!(
                        attempt = attempt + 1,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "LLM completion received"
                    );
                    return Ok(content);
                }
                Err(e) if e.is_retryable() => {
                    warn!(attempt = attempt + 1, "LLM call failed: {e}");
                    last_error = Some(e);
                }
                Err(e) => {
                    error!("LLM call failed without retry: {e}");
                    return Err(e);
                }
            }
        }

        let last = last_error.unwrap_or(LlmError::EmptyContent);
        error!("LLM call exhausted {attempts} attempts: {last}");
        Err(LlmError::RetriesExhausted {
            attempts,
            last: Box::new(last),
        })
    }
}

#[async_trait]
impl ChatCompletion for LlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let body = CompletionRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        match tokio::time::timeout(self.settings.total_timeout, self.complete_with_retries(&body))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "LLM call exceeded total budget of {}ms",
                    self.settings.total_timeout.as_millis()
                );
                Err(LlmError::Timeout)
            }
        }
    }

    async fn probe(&self) -> ProbeReport {
        let started = Instant::now();
        let result = self
            .client
            .get(&self.settings.models_url)
            .bearer_auth(&self.settings.api_key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let status = response.status();
                ProbeReport {
                    reachable: status.is_success(),
                    status: Some(status.as_u16()),
                    latency_ms,
                    error: (!status.is_success())
                        .then(|| format!("upstream answered {status}")),
                }
            }
            Err(e) => ProbeReport {
                reachable: false,
                status: None,
                latency_ms,
                error: Some(LlmError::from(e).to_string()),
            },
        }
    }
}
