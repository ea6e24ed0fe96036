//! Web search collaborator used for external-factor research.
//!
//! A search maps a query string to free text. Failures of individual
//! searches are expected and handled by the pipeline, which folds them
//! into the research digest instead of aborting.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::{LlmConfig, SearchConfig};
use crate::llm::AnthropicModel;

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String>;
}

/// Search through the Anthropic `web_search` server tool.
pub struct AnthropicWebSearch {
    client: AnthropicModel,
    max_tokens: u32,
}

impl AnthropicWebSearch {
    pub fn new(llm: &LlmConfig, search: &SearchConfig) -> Result<Self> {
        Ok(Self {
            client: AnthropicModel::from_config(llm)?,
            max_tokens: search.max_tokens,
        })
    }
}

#[async_trait]
impl WebSearch for AnthropicWebSearch {
    async fn search(&self, query: &str) -> Result<String> {
        let tools = json!({
            "tools": [{ "type": "web_search_20250305", "name": "web_search" }]
        });
        let user = format!(
            "Find current information for the query and summarise the key facts: {}",
            query
        );
        let blocks = self
            .client
            .send(None, &user, self.max_tokens, Some(tools))
            .await?;

        if blocks.is_empty() {
            Ok("No results found".to_string())
        } else {
            Ok(blocks.join("\n"))
        }
    }
}

/// Search that always fails; research degrades to failure notes.
pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    async fn search(&self, _query: &str) -> Result<String> {
        bail!("web search is disabled")
    }
}

/// Create the configured search collaborator.
pub fn create_search(llm: &LlmConfig, search: &SearchConfig) -> Result<Box<dyn WebSearch>> {
    match search.provider.as_str() {
        "anthropic" => Ok(Box::new(AnthropicWebSearch::new(llm, search)?)),
        "disabled" => Ok(Box::new(DisabledSearch)),
        other => bail!("Unknown search provider: {}", other),
    }
}
