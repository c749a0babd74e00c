//! Chat-completion provider abstraction.
//!
//! The suggestion pipeline treats the language model as a black-box
//! capability: one operation, "complete a chat with structured JSON output",
//! parameterized by a system prompt and user content. The [`ChatProvider`]
//! trait is the seam that lets the reconciliation engine run against fakes
//! in tests and lets the vendor be swapped without touching pipeline logic.
//!
//! Implementations:
//! - **[`OpenAiChat`]** — `POST /v1/chat/completions` with
//!   `response_format: json_object`.
//! - **[`OllamaChat`]** — `POST /api/chat` on a local Ollama instance with
//!   `format: "json"`.
//!
//! Both use the same retry strategy as the embedding providers:
//! 429/5xx/network errors retry with exponential backoff (capped at 2^5),
//! other 4xx fail immediately.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;

/// A chat-completion capability that returns structured JSON.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o"`).
    fn model_name(&self) -> &str;

    /// Complete a chat with a system instruction and user content,
    /// returning the model's output parsed as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error when the API call fails after retries or the
    /// model output is not valid JSON. Callers in the suggestion pipeline
    /// decide whether that degrades to a default or propagates.
    async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value>;
}

/// Chat provider using the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAiChat {
    model: String,
    config: LlmConfig,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "response_format": { "type": "json_object" },
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_openai_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after retries")))
    }
}

fn parse_openai_chat_response(json: &serde_json::Value) -> Result<serde_json::Value> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?;

    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Model output is not valid JSON: {}", e))
}

/// Chat provider using a local Ollama instance.
///
/// Calls `POST /api/chat` with `format: "json"` on the configured URL
/// (default: `http://localhost:11434`).
pub struct OllamaChat {
    model: String,
    url: String,
    config: LlmConfig,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            url,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ChatProvider for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "format": "json",
            "stream": false,
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(format!("{}/api/chat", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_ollama_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Ollama API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow::anyhow!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url,
                        e
                    ));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Ollama chat failed after retries")))
    }
}

fn parse_ollama_chat_response(json: &serde_json::Value) -> Result<serde_json::Value> {
    let content = json
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message content"))?;

    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Model output is not valid JSON: {}", e))
}

/// A chat provider that always fails. Used when `llm.provider = "disabled"`;
/// every caller in the pipeline has a documented degradation path.
pub struct DisabledChat;

#[async_trait]
impl ChatProvider for DisabledChat {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete_json(&self, _system: &str, _user: &str) -> Result<serde_json::Value> {
        bail!("Chat provider is disabled")
    }
}

/// Create the appropriate [`ChatProvider`] based on configuration.
pub fn create_chat_provider(config: &LlmConfig) -> Result<Box<dyn ChatProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledChat)),
        "openai" => Ok(Box::new(OpenAiChat::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_chat_response() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "content": "{\"score\": 4}" } }
            ]
        });
        let parsed = parse_openai_chat_response(&json).unwrap();
        assert_eq!(parsed["score"], 4);
    }

    #[test]
    fn test_parse_openai_chat_response_non_json_content() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "content": "sure, here you go" } }
            ]
        });
        assert!(parse_openai_chat_response(&json).is_err());
    }

    #[test]
    fn test_parse_ollama_chat_response() {
        let json = serde_json::json!({
            "message": { "content": "{\"goals\": []}" }
        });
        let parsed = parse_ollama_chat_response(&json).unwrap();
        assert!(parsed["goals"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_chat_errors() {
        let err = DisabledChat
            .complete_json("system", "user")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }
}
