//! Language-model collaborator and the JSON invocation protocol.
//!
//! Every model-mediated step goes through [`invoke_json`]:
//!
//! ```text
//! render(system, template, vars) ──▶ model.complete ──▶ extract_json
//!        ▲                                                  │
//!        └──────── retry (malformed output only) ◀──────────┘
//! ```
//!
//! Transport and API failures are never retried here; they surface to the
//! caller on the first occurrence. Only [`LlmError::MalformedOutput`] is
//! retried, up to `max_retries` extra attempts.

mod anthropic;
mod json;

pub use anthropic::AnthropicModel;
pub use json::extract_json;

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

use crate::config::LlmConfig;

/// Failure modes of a model call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("invalid llm configuration: {0}")]
    Config(String),

    #[error("model request failed: {0}")]
    Transport(String),

    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model returned malformed JSON after {attempts} attempt(s): {detail}")]
    MalformedOutput { attempts: u32, detail: String },
}

impl LlmError {
    /// Only malformed output is worth asking the model again for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::MalformedOutput { .. })
    }
}

/// A text-completion model: system instruction + user message → text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Build the configured model client.
///
/// Fails with [`LlmError::MissingCredential`] before any request is made
/// when the API key variable is unset.
pub fn create_model(config: &LlmConfig) -> Result<Box<dyn LanguageModel>, LlmError> {
    match config.provider.as_str() {
        "anthropic" => Ok(Box::new(AnthropicModel::from_config(config)?)),
        other => Err(LlmError::Config(format!(
            "unsupported llm provider: {}",
            other
        ))),
    }
}

/// Run `attempt` up to `max_attempts` times, re-invoking only on
/// retryable errors. The attempt number (starting at 1) is passed in.
pub async fn with_retry<T, F, Fut>(max_attempts: u32, mut attempt: F) -> Result<T, LlmError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && n < max_attempts => {
                tracing::warn!(attempt = n, max_attempts, error = %e, "retrying model call");
                n += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// A step prompt: fixed system instruction plus a user template.
#[derive(Debug, Clone, Copy)]
pub struct Prompt {
    pub name: &'static str,
    pub system: &'static str,
    pub template: &'static str,
}

/// Render a prompt, call the model, and parse a JSON object out of the
/// answer, retrying malformed answers `max_retries` times.
pub async fn invoke_json(
    model: &dyn LanguageModel,
    prompt: &Prompt,
    vars: &[(&str, &str)],
    max_retries: u32,
) -> Result<Value, LlmError> {
    let system = render_template(prompt.system, vars);
    let user = render_template(prompt.template, vars);
    let max_attempts = max_retries + 1;

    tracing::debug!(
        prompt = prompt.name,
        model = model.model_name(),
        user_chars = user.len(),
        "invoking model"
    );

    with_retry(max_attempts, |n| {
        let system = &system;
        let user = &user;
        async move {
            let text = model.complete(system, user).await?;
            extract_json(&text).map_err(|detail| {
                tracing::debug!(
                    prompt = prompt.name,
                    response = %preview(&text),
                    "unparsable answer"
                );
                LlmError::MalformedOutput {
                    attempts: n,
                    detail,
                }
            })
        }
    })
    .await
}

/// Substitute `{name}` placeholders in one pass.
///
/// Braces that do not enclose a supplied variable name are copied
/// verbatim, so JSON examples in templates need no escaping. Substituted
/// values are not rescanned.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (close, *v))
        });

        match substituted {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
