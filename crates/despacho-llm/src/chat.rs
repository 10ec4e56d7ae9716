//! OpenAI-compatible chat-completions provider
//!
//! Talks to any endpoint exposing the `/v1/chat/completions` shape. Both the
//! primary and fallback LLM slots in the classifier are instances of this
//! provider pointed at different endpoints/models.
//!
//! # Features
//!
//! - Async HTTP via `reqwest`
//! - Retry with exponential backoff
//! - Per-request timeout
//! - Cost estimation from reported token usage

use crate::price_table;
use async_trait::async_trait;
use despacho_domain::traits::{Generation, GenerationError, TextGenerator};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::warn;

/// Default request timeout (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Chat-completions API provider
pub struct ChatCompletionsProvider {
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl ChatCompletionsProvider {
    /// Create a new provider
    ///
    /// # Parameters
    ///
    /// - `name`: stable name used in logs ("openai", "azure-openai", ...)
    /// - `endpoint`: API base, e.g. `https://api.openai.com`
    /// - `api_key`: bearer token
    /// - `model`: model to invoke, e.g. `gpt-4o-mini`
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("reqwest client construction cannot fail with static config");

        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Estimate call cost from token usage and the model's price table entry
    fn cost_for(&self, tokens_in: u64, tokens_out: u64) -> f64 {
        let (input, output) = price_table()
            .get(self.model.as_str())
            .copied()
            .unwrap_or((0.000_15, 0.000_6));
        (tokens_in as f64 / 1000.0) * input + (tokens_out as f64 / 1000.0) * output
    }

    async fn request_once(
        &self,
        body: &ChatRequest,
    ) -> Result<ChatResponse, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Communication(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<ChatResponse>()
                .await
                .map_err(|e| GenerationError::InvalidResponse(format!("bad payload: {e}")))
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(GenerationError::RateLimited)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(GenerationError::ModelNotAvailable(self.model.clone()))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(GenerationError::Communication(format!(
                "HTTP {status}: {text}"
            )))
        }
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Generation, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::Unconfigured(format!(
                "{}: missing API key",
                self.name
            )));
        }

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature,
            max_tokens,
        };

        let start = Instant::now();
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.request_once(&body).await {
                Ok(parsed) => {
                    let text = parsed
                        .choices
                        .first()
                        .and_then(|c| c.message.content.clone())
                        .ok_or_else(|| {
                            GenerationError::InvalidResponse("empty choices".to_string())
                        })?;

                    // Fall back to a character estimate when the API omits usage
                    let (tokens_in, tokens_out) = match parsed.usage {
                        Some(u) => (u.prompt_tokens, u.completion_tokens),
                        None => ((prompt.len() / 4) as u64, (text.len() / 4) as u64),
                    };

                    return Ok(Generation {
                        cost: self.cost_for(tokens_in, tokens_out),
                        tokens_in,
                        tokens_out,
                        elapsed: start.elapsed(),
                        text,
                    });
                }
                // Misconfiguration and missing models will not fix themselves on retry
                Err(e @ GenerationError::ModelNotAvailable(_))
                | Err(e @ GenerationError::Unconfigured(_)) => return Err(e),
                Err(e) => {
                    warn!(provider = %self.name, attempt = attempts + 1, "generation attempt failed: {e}");
                    last_error = Some(e);
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, ...
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempts - 1))).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| GenerationError::Communication("max retries exceeded".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_construction() {
        let provider =
            ChatCompletionsProvider::new("openai", "https://api.openai.com", "sk-test", "gpt-4o-mini")
                .with_max_retries(5);
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.max_retries, 5);
    }

    #[test]
    fn test_cost_uses_price_table() {
        let provider =
            ChatCompletionsProvider::new("openai", "http://x", "k", "gpt-4o-mini");
        let cost = provider.cost_for(1000, 1000);
        assert!((cost - 0.000_75).abs() < 1e-9);
    }

    #[test]
    fn test_cost_unknown_model_uses_default() {
        let provider = ChatCompletionsProvider::new("openai", "http://x", "k", "desconhecido");
        assert!(provider.cost_for(1000, 0) > 0.0);
    }

    #[tokio::test]
    async fn test_unconfigured_without_key() {
        let provider = ChatCompletionsProvider::new("openai", "http://localhost:1", "", "m");
        let result = provider.generate("oi", 0.1, 10).await;
        assert!(matches!(result, Err(GenerationError::Unconfigured(_))));
    }

    #[tokio::test]
    async fn test_communication_error_surfaces() {
        // Unroutable endpoint triggers a communication error after retries
        let provider = ChatCompletionsProvider::new("openai", "http://127.0.0.1:9", "k", "m")
            .with_max_retries(1);
        let result = provider.generate("oi", 0.1, 10).await;
        assert!(matches!(result, Err(GenerationError::Communication(_))));
    }
}
