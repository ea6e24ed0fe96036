//! TOML configuration.
//!
//! Every section and field is optional; a missing config file yields
//! [`Config::default`]. Environment variables are consulted only here
//! (model override) and in collaborator constructors (credentials), so the
//! resulting [`Config`] is the single source of settings for a run.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub comparison: ComparisonConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("swot.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputsConfig {
    #[serde(default = "default_outputs_dir")]
    pub dir: PathBuf,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            dir: default_outputs_dir(),
        }
    }
}

fn default_outputs_dir() -> PathBuf {
    PathBuf::from("outputs")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Extra attempts after a malformed (non-JSON) answer.
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Language the model is asked to answer in.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            max_tokens: default_max_tokens(),
            max_retries: default_llm_retries(),
            timeout_secs: default_llm_timeout_secs(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            language: default_language(),
        }
    }
}

impl LlmConfig {
    /// Model name after defaults; `load_config` resolves `CLAUDE_MODEL`.
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

fn default_llm_provider() -> String {
    "anthropic".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_llm_retries() -> u32 {
    2
}
fn default_llm_timeout_secs() -> u64 {
    300
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_language() -> String {
    "English".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_provider")]
    pub provider: String,
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,
    #[serde(default = "default_query")]
    pub default_query: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            max_queries: default_max_queries(),
            default_query: default_query(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_search_provider() -> String {
    "anthropic".to_string()
}
fn default_max_queries() -> usize {
    3
}
fn default_query() -> String {
    "market trends".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

/// Local embeddings when fastembed is compiled in, otherwise none.
fn default_provider() -> String {
    if cfg!(feature = "local-embeddings-fastembed") {
        "local".to_string()
    } else {
        "disabled".to_string()
    }
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ComparisonConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    crate::align::DEFAULT_THRESHOLD
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    if config.llm.model.is_none() {
        if let Ok(model) = std::env::var("CLAUDE_MODEL") {
            if !model.trim().is_empty() {
                config.llm.model = Some(model);
            }
        }
    }

    validate(&config)?;
    Ok(config)
}

/// Check value ranges and provider names.
pub fn validate(config: &Config) -> Result<()> {
    if !(0.0..=1.0).contains(&config.comparison.similarity_threshold) {
        anyhow::bail!("comparison.similarity_threshold must be in [0.0, 1.0]");
    }

    if config.search.max_queries == 0 {
        anyhow::bail!("search.max_queries must be >= 1");
    }

    if config.llm.max_tokens == 0 {
        anyhow::bail!("llm.max_tokens must be > 0");
    }

    match config.llm.provider.as_str() {
        "anthropic" => {}
        other => anyhow::bail!("Unknown llm provider: '{}'. Must be anthropic.", other),
    }

    match config.search.provider.as_str() {
        "anthropic" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown search provider: '{}'. Must be anthropic or disabled.",
            other
        ),
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    Ok(())
}
