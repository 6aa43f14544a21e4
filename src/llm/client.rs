//! OpenAI-compatible chat completions client
//!
//! Works against any endpoint speaking the chat completions wire format.
//! The API key comes from `OPENAI_API_KEY`, falling back to
//! `OPENROUTER_API_KEY` (which also switches the default base URL and adds
//! the attribution headers OpenRouter expects).

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use super::types::*;
use crate::config::Config;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

const OPENROUTER_REFERER: &str = "https://github.com/quantgpt";
const OPENROUTER_TITLE: &str = "QuantGPT";

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Which provider supplied the API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeySource {
    OpenAi,
    OpenRouter,
}

/// Chat completions client
pub struct LlmClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    key_source: KeySource,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    seed: Option<u64>,
    json_mode_default: bool,
}

impl LlmClient {
    /// Create a client from configuration, reading the API key from the
    /// environment
    pub fn from_config(config: &Config) -> Result<Self> {
        let (api_key, key_source) = match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => (key, KeySource::OpenAi),
            _ => match std::env::var("OPENROUTER_API_KEY") {
                Ok(key) if !key.is_empty() => (key, KeySource::OpenRouter),
                _ => anyhow::bail!(
                    "No API key found. Set OPENAI_API_KEY or OPENROUTER_API_KEY \
                     (a .env file in the working directory is loaded at startup)."
                ),
            },
        };

        let section = &config.openai;
        let base_url = section
            .base_url
            .clone()
            .unwrap_or_else(|| match key_source {
                KeySource::OpenAi => OPENAI_BASE_URL.to_string(),
                KeySource::OpenRouter => OPENROUTER_BASE_URL.to_string(),
            });

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(section.request_timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            key_source,
            model: section.model.clone(),
            temperature: section.temperature,
            // 0 means "use the server default", i.e. omit the field
            max_tokens: section.max_output_tokens.filter(|&t| t > 0),
            seed: section.seed,
            json_mode_default: section.json_mode,
        })
    }

    /// Client pointed at an unreachable endpoint, for tests that never
    /// issue a request
    #[cfg(test)]
    pub(crate) fn offline_for_tests() -> Self {
        let section = crate::config::OpenAiConfig {
            base_url: Some("http://127.0.0.1:9".to_string()),
            ..crate::config::OpenAiConfig::default()
        };
        Self {
            http_client: reqwest::Client::new(),
            base_url: section.base_url.clone().unwrap_or_default(),
            api_key: "sk-test".to_string(),
            key_source: KeySource::OpenAi,
            model: section.model.clone(),
            temperature: section.temperature,
            max_tokens: section.max_output_tokens,
            seed: section.seed,
            json_mode_default: section.json_mode,
        }
    }

    /// Model identifier this client sends requests for
    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .context("Invalid API key")?,
        );
        if self.key_source == KeySource::OpenRouter {
            headers.insert("HTTP-Referer", HeaderValue::from_static(OPENROUTER_REFERER));
            headers.insert("X-Title", HeaderValue::from_static(OPENROUTER_TITLE));
        }
        Ok(headers)
    }

    fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        json_mode: Option<bool>,
    ) -> ChatRequest {
        let force_json = json_mode.unwrap_or(self.json_mode_default);
        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            seed: self.seed,
            response_format: force_json.then(ResponseFormat::json_object),
            tools,
        }
    }

    /// Single-turn completion; returns the assistant's text.
    ///
    /// `json_mode = Some(true)` requests a JSON object response; `None`
    /// falls back to the configured default.
    pub async fn chat(
        &self,
        prompt: &str,
        system: Option<&str>,
        json_mode: Option<bool>,
    ) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));

        let request = self.build_request(messages, vec![], json_mode);
        let response = self.post_chat(&request).await?;
        Ok(response.text())
    }

    /// Completion over a full conversation with function-calling tools
    /// advertised; returns the assistant message (text and/or tool calls).
    pub async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AssistantMessage> {
        let request = self.build_request(messages.to_vec(), tools.to_vec(), Some(false));
        let response = self.post_chat(&request).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .context("API response contained no choices")
    }

    /// POST with retry and capped exponential backoff on transport errors,
    /// 429 and 5xx responses
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let result = self
                .http_client
                .post(&url)
                .headers(self.headers()?)
                .json(request)
                .send()
                .await;

            let retryable_error = match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json()
                            .await
                            .context("Failed to parse API response");
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    let message = match serde_json::from_str::<ApiErrorBody>(&error_text) {
                        Ok(body) => body.error.message,
                        Err(_) => error_text,
                    };

                    if status.as_u16() == 429 || status.is_server_error() {
                        format!("API error ({}): {}", status, message)
                    } else {
                        anyhow::bail!("API error ({}): {}", status, message);
                    }
                }
                Err(e) => format!("Request failed: {}", e),
            };

            if attempt > MAX_RETRIES {
                anyhow::bail!("{} (after {} retries)", retryable_error, MAX_RETRIES);
            }

            let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << (attempt - 1)));
            warn!(attempt, error = %retryable_error, delay_ms = delay.as_millis() as u64, "retrying chat request");
            tokio::time::sleep(delay).await;
        }
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the API key
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

/// Extract the first JSON object from model output, tolerating markdown
/// fences around it. JSON-mode responses should already be bare objects;
/// this guards against models that wrap them anyway.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        debug!("response contained braces in the wrong order");
        return None;
    }
    Some(&text[start..=end])
}
