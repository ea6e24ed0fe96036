//! Analysis pipeline: source text + company context → [`Analysis`].
//!
//! ```text
//! internal factors ─▶ search queries ─▶ web research ─▶ external factors ─▶ strategic pairs
//!   (S, W)              (≤ max_queries)   (digest)        (O, T)              (SO WO ST WT)
//! ```
//!
//! Each model step goes through [`invoke_json`], so malformed answers are
//! retried and transport errors abort the run. Individual search failures
//! are folded into the research digest instead.

use anyhow::Result;
use serde_json::Value;

use crate::config::Config;
use crate::decode;
use crate::llm::{invoke_json, LanguageModel, Prompt};
use crate::models::{context_fingerprint, now_millis, Analysis, SwotItem};
use crate::progress::{Phase, ProgressEvent, ProgressReporter};
use crate::prompts;
use crate::search::WebSearch;

/// Per-run knobs taken from [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_retries: u32,
    pub language: String,
    pub max_queries: usize,
    pub default_query: String,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.llm.max_retries,
            language: config.llm.language.clone(),
            max_queries: config.search.max_queries,
            default_query: config.search.default_query.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct AnalysisPipeline<'a> {
    model: &'a dyn LanguageModel,
    search: &'a dyn WebSearch,
    settings: PipelineSettings,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> AnalysisPipeline<'a> {
    pub fn new(
        model: &'a dyn LanguageModel,
        search: &'a dyn WebSearch,
        settings: PipelineSettings,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            model,
            search,
            settings,
            reporter,
        }
    }

    pub async fn run(
        &self,
        source_identifier: &str,
        source_text: &str,
        context_text: &str,
    ) -> Result<Analysis> {
        self.reporter.report(ProgressEvent::Started {
            source: source_identifier.to_string(),
        });

        // Internal factors
        self.reporter
            .report(ProgressEvent::PhaseStarted(Phase::InternalFactors));
        let internal = self
            .invoke(
                &prompts::INTERNAL_FACTORS,
                &[("context", context_text), ("text", source_text)],
            )
            .await?;
        let strengths = decode::items(&internal, "strengths");
        let weaknesses = decode::items(&internal, "weaknesses");
        self.finished(
            Phase::InternalFactors,
            format!("S: {}, W: {}", strengths.len(), weaknesses.len()),
        );

        // Search queries
        self.reporter
            .report(ProgressEvent::PhaseStarted(Phase::SearchQueries));
        let query_data = self
            .invoke(&prompts::SEARCH_QUERIES, &[("context", context_text)])
            .await?;
        let mut queries = decode::string_list(&query_data, "queries");
        if queries.is_empty() {
            queries.push(self.settings.default_query.clone());
        }
        queries.truncate(self.settings.max_queries);
        self.finished(Phase::SearchQueries, format!("{} queries", queries.len()));

        // Research
        self.reporter.report(ProgressEvent::PhaseStarted(Phase::Research));
        let digest = self.research(&queries).await;
        self.finished(Phase::Research, format!("{} chars", digest.len()));

        // External factors
        self.reporter
            .report(ProgressEvent::PhaseStarted(Phase::ExternalFactors));
        let external = self
            .invoke(
                &prompts::EXTERNAL_FACTORS,
                &[("context", context_text), ("search_results", digest.as_str())],
            )
            .await?;
        let opportunities = decode::items(&external, "opportunities");
        let threats = decode::items(&external, "threats");
        self.finished(
            Phase::ExternalFactors,
            format!("O: {}, T: {}", opportunities.len(), threats.len()),
        );

        // Strategic pairs
        self.reporter
            .report(ProgressEvent::PhaseStarted(Phase::StrategicPairs));
        let (s, w, o, t) = (
            bullets(&strengths),
            bullets(&weaknesses),
            bullets(&opportunities),
            bullets(&threats),
        );
        let strategic = self
            .invoke(
                &prompts::STRATEGIC_PAIRS,
                &[
                    ("strengths", s.as_str()),
                    ("weaknesses", w.as_str()),
                    ("opportunities", o.as_str()),
                    ("threats", t.as_str()),
                ],
            )
            .await?;
        let strategic_so = decode::pairs(&strategic, "so", false);
        let strategic_wo = decode::pairs(&strategic, "wo", false);
        let strategic_st = decode::pairs(&strategic, "st", false);
        let strategic_wt = decode::pairs(&strategic, "wt", true);
        self.finished(
            Phase::StrategicPairs,
            format!(
                "SO: {}, WO: {}, ST: {}, WT: {}",
                strategic_so.len(),
                strategic_wo.len(),
                strategic_st.len(),
                strategic_wt.len()
            ),
        );

        Ok(Analysis {
            source_identifier: source_identifier.to_string(),
            source_text: source_text.to_string(),
            context_fingerprint: context_fingerprint(context_text),
            strengths,
            weaknesses,
            opportunities,
            threats,
            strategic_so,
            strategic_wo,
            strategic_st,
            strategic_wt,
            created_at: now_millis(),
        })
    }

    /// Run each query in order and concatenate `Query/Result` blocks.
    async fn research(&self, queries: &[String]) -> String {
        let mut blocks = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            self.reporter.report(ProgressEvent::Searching {
                query: query.clone(),
                n: i + 1,
                total: queries.len(),
            });
            let result = match self.search.search(query).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(query = %query, error = %e, "web search failed");
                    format!("Search failed: {}", e)
                }
            };
            blocks.push(format!("Query: {}\nResult: {}\n", query, result));
        }
        blocks.join("\n")
    }

    async fn invoke(&self, prompt: &Prompt, vars: &[(&str, &str)]) -> Result<Value> {
        let mut all: Vec<(&str, &str)> = vars.to_vec();
        all.push(("language", self.settings.language.as_str()));
        Ok(invoke_json(self.model, prompt, &all, self.settings.max_retries).await?)
    }

    fn finished(&self, phase: Phase, detail: String) {
        self.reporter
            .report(ProgressEvent::PhaseFinished { phase, detail });
    }
}

/// `- text` per item, one per line.
pub fn bullets(items: &[SwotItem]) -> String {
    items
        .iter()
        .map(|i| format!("- {}", i.text))
        .collect::<Vec<_>>()
        .join("\n")
}
