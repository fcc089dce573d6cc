//! Chat completions client.
//!
//! Blocking HTTP with retries: capped exponential backoff plus jitter, rate
//! limits honored via Retry-After when the server sends one. Responses
//! are requested in strict JSON-schema mode so the model can only
//! answer with the document shape we asked for.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AgentConfig;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("response carried no message content")]
    MissingContent,

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 8_000;
const JITTER_MS: u64 = 250;

/// What to do after one HTTP attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryVerdict {
    /// Sleep for the given delay (jitter added by the caller), then retry.
    Retry(Duration),
    /// Retries spent while rate limited.
    GiveUp,
    /// Hand the response through for decoding or error reporting.
    Settle,
}

/// Capped exponential backoff after `attempts` completed attempts:
/// 500ms, 1s, 2s... up to 8s.
fn backoff_delay(attempts: u32) -> Duration {
    let ms = BASE_BACKOFF_MS
        .saturating_mul(2u64.saturating_pow(attempts.saturating_sub(1)))
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(ms)
}

/// Per-attempt retry decision. `status` is `None` for a transport error
/// that never produced a response; `retry_after_secs` is the parsed
/// Retry-After header, honored over the backoff schedule on 429.
fn retry_verdict(
    status: Option<u16>,
    attempts: u32,
    max_retries: u32,
    retry_after_secs: Option<u64>,
) -> RetryVerdict {
    let spent = attempts >= max_retries;
    match status {
        Some(429) if spent => RetryVerdict::GiveUp,
        Some(429) => RetryVerdict::Retry(
            retry_after_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| backoff_delay(attempts)),
        ),
        Some(s) if (500..600).contains(&s) && !spent => {
            RetryVerdict::Retry(backoff_delay(attempts))
        }
        Some(_) => RetryVerdict::Settle,
        None if spent => RetryVerdict::GiveUp,
        None => RetryVerdict::Retry(backoff_delay(attempts)),
    }
}

/// Chat API client bound to one model and endpoint.
pub struct ChatClient {
    client: reqwest::blocking::Client,
    config: AgentConfig,
    api_key: String,
}

impl ChatClient {
    pub fn new(config: AgentConfig, api_key: String) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// One completion call. `schema` switches the response format to
    /// strict JSON-schema mode; the returned string is the raw message
    /// content either way.
    pub fn complete(
        &self,
        messages: &[ChatMessage],
        schema: Option<serde_json::Value>,
    ) -> Result<String, ClientError> {
        let url = format!("{}/chat/completions", self.config.api_base);
        let mut body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": messages,
        });
        if let Some(schema) = schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": schema,
            });
        }

        let max_retries = self.config.max_http_retries;
        let mut rng = rand::thread_rng();
        let mut attempts = 0;
        loop {
            attempts += 1;
            debug!(model = %self.config.model, attempts, "sending completion request");
            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
            {
                Ok(response) => response,
                Err(e) => match retry_verdict(None, attempts, max_retries, None) {
                    RetryVerdict::Retry(delay) => {
                        warn!(error = %e, attempts, "request failed, retrying");
                        pause(delay, &mut rng);
                        continue;
                    }
                    _ => return Err(e.into()),
                },
            };

            let status = response.status();
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            match retry_verdict(Some(status.as_u16()), attempts, max_retries, retry_after) {
                RetryVerdict::Retry(delay) => {
                    warn!(status = status.as_u16(), attempts, "retryable response");
                    pause(delay, &mut rng);
                }
                RetryVerdict::GiveUp => return Err(ClientError::RateLimited { attempts }),
                RetryVerdict::Settle => {
                    if !status.is_success() {
                        return Err(ClientError::Api {
                            status: status.as_u16(),
                            body: response.text().unwrap_or_default(),
                        });
                    }
                    let decoded: CompletionResponse = serde_json::from_str(&response.text()?)?;
                    return decoded
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.message.content)
                        .ok_or(ClientError::MissingContent);
                }
            }
        }
    }
}

fn pause(delay: Duration, rng: &mut impl Rng) {
    let jitter = Duration::from_millis(rng.gen_range(0..JITTER_MS));
    std::thread::sleep(delay + jitter);
}
