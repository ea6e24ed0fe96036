//! Anthropic Messages API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{LanguageModel, LlmError};
use crate::config::LlmConfig;

const API_VERSION: &str = "2023-06-01";

/// Claude via `POST {base_url}/v1/messages`.
pub struct AnthropicModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicModel {
    /// Build a client, reading the API key from `config.api_key_env`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingCredential(config.api_key_env.clone()))?;

        Self::new(
            &api_key,
            &config.base_url,
            config.model_name(),
            config.max_tokens,
            config.timeout_secs,
        )
    }

    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|_| LlmError::Config("API key is not a valid header value".into()))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
        })
    }

    /// Send one Messages request and return its text blocks in order.
    ///
    /// `extra` is merged into the request body (e.g. `tools`).
    pub(crate) async fn send(
        &self,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
        extra: Option<Value>,
    ) -> Result<Vec<String>, LlmError> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": user }],
        });
        if let Some(system) = system {
            body["system"] = Value::String(system.to_string());
        }
        if let Some(Value::Object(extra)) = extra {
            for (k, v) in extra {
                body[k] = v;
            }
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode response: {}", e)))?;

        Ok(text_blocks(parsed))
    }
}

/// Text of the `text` blocks, in order; tool-use and tool-result blocks are
/// skipped.
fn text_blocks(response: MessagesResponse) -> Vec<String> {
    response
        .content
        .into_iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text)
        .collect()
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let blocks = self
            .send(Some(system), user, self.max_tokens, None)
            .await?;
        Ok(blocks.join(""))
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}
