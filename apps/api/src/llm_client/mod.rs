/// LLM Client — the single point of entry for all chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the model provider directly.
/// Handlers and analysis code go through `ChatModel`, usually via
/// `fallback::complete_with_fallback` so the configured model list is honoured.
///
/// Wire format: OpenAI-compatible `POST {base}/chat/completions`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod fallback;
pub mod prompts;
#[cfg(test)]
pub mod testing;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} attempts")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No API key supplied for the LLM provider")]
    MissingApiKey,

    #[error("No models configured")]
    NoModels,

    #[error("All models failed:\n{}", .attempts.join("\n"))]
    AllModelsFailed { attempts: Vec<String> },
}

impl LlmError {
    /// Credential failures hit every model the same way, so the fallback
    /// chain stops on them instead of walking the whole list.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            LlmError::MissingApiKey => true,
            LlmError::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

/// One chat call: a system instruction plus a single user turn.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub prompt: &'a str,
    /// Per-request key; falls back to the client's configured key.
    pub api_key: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// The seam between orchestration code and the model provider.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<Completion, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatCompletionResponse {
    fn into_completion(self, requested_model: &str) -> Result<Completion, LlmError> {
        let usage = self.usage.unwrap_or_default();
        let text = self
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)?;

        Ok(Completion {
            text,
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// HTTP chat-completions client with retry on 429/5xx.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    retry_base_delay: Duration,
}

impl LlmClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self, LlmError> {
        Self::with_timing(
            base_url,
            api_key,
            temperature,
            max_tokens,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            RETRY_BASE_DELAY,
        )
    }

    fn with_timing(
        base_url: impl Into<String>,
        api_key: Option<String>,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
        retry_base_delay: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
            api_key,
            temperature,
            max_tokens,
            retry_base_delay,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<Completion, LlmError> {
        let api_key = request
            .api_key
            .or(self.api_key.as_deref())
            .ok_or(LlmError::MissingApiKey)?;

        let request_body = ChatCompletionRequest {
            model: request.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(self.retry_base_delay, attempt);
                warn!(
                    model = request.model,
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(self.endpoint())
                .bearer_auth(api_key)
                .json(&request_body)
                .send()
                .await;

            // Only refused connections are retried, never timeouts.
            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_connect() => {
                    warn!(model = request.model, "LLM API unreachable: {e}");
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
                Err(e) => return Err(LlmError::Http(e)),
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!(model = request.model, "LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: provider_message(&body),
                });
            }

            let parsed: ChatCompletionResponse = response.json().await?;
            let completion = parsed.into_completion(request.model)?;

            debug!(
                model = %completion.model,
                prompt_tokens = completion.prompt_tokens,
                completion_tokens = completion.completion_tokens,
                "LLM call succeeded"
            );

            return Ok(completion);
        }

        Err(match last_error {
            Some(LlmError::Api { status: 429, .. }) | None => LlmError::RateLimited {
                retries: MAX_RETRIES,
            },
            Some(e) => e,
        })
    }
}

/// Exponential backoff before retry `attempt` (1-based): base, 2×base, ...
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * (1 << attempt.saturating_sub(1))
}

/// Pulls `error.message` out of a provider error body, or returns the raw body.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<ProviderError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Deserializes a model reply that was instructed to be JSON.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_json_fences(text)).map_err(LlmError::Parse)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
