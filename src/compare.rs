//! Comparison pipeline: two stored analyses → classified [`Comparison`].
//!
//! Factor texts of both runs are flattened in S, W, O, T order and aligned
//! by embedding similarity. The alignment is passed to the model as a hint
//! together with the texts of both runs; the model's classification is
//! taken as returned.

use anyhow::Result;
use serde_json::json;

use crate::align::{align, AlignedPair};
use crate::decode;
use crate::embedding::EmbeddingProvider;
use crate::llm::{invoke_json, LanguageModel};
use crate::models::{now_millis, Analysis, Comparison, Quadrant, StoredAnalysis};
use crate::progress::{Phase, ProgressEvent, ProgressReporter};
use crate::prompts;

pub struct ComparisonPipeline<'a> {
    model: &'a dyn LanguageModel,
    embedder: Option<&'a dyn EmbeddingProvider>,
    threshold: f32,
    max_retries: u32,
    language: String,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> ComparisonPipeline<'a> {
    pub fn new(
        model: &'a dyn LanguageModel,
        embedder: Option<&'a dyn EmbeddingProvider>,
        threshold: f32,
        max_retries: u32,
        language: &str,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            model,
            embedder,
            threshold,
            max_retries,
            language: language.to_string(),
            reporter,
        }
    }

    pub async fn compare(
        &self,
        previous: &StoredAnalysis,
        current: &StoredAnalysis,
    ) -> Result<Comparison> {
        self.reporter
            .report(ProgressEvent::PhaseStarted(Phase::Comparison));

        let old_texts = previous.analysis.flat_texts();
        let new_texts = current.analysis.flat_texts();
        let hints = self.similarity_hints(&old_texts, &new_texts).await;

        let old_swot = factor_texts_json(&previous.analysis);
        let new_swot = factor_texts_json(&current.analysis);
        let similar_pairs = serde_json::to_string(&hints)?;
        let threshold = self.threshold.to_string();

        let data = invoke_json(
            self.model,
            &prompts::COMPARISON,
            &[
                ("old_swot", old_swot.as_str()),
                ("new_swot", new_swot.as_str()),
                ("similar_pairs", similar_pairs.as_str()),
                ("threshold", threshold.as_str()),
                ("language", self.language.as_str()),
            ],
            self.max_retries,
        )
        .await?;

        let items = decode::comparison_items(&data, "items");
        for item in items.iter().filter(|i| !i.is_consistent()) {
            tracing::warn!(
                change_type = %item.change_type,
                old_text = ?item.old_text,
                new_text = ?item.new_text,
                "comparison item is inconsistent with its missing side"
            );
        }

        let comparison = Comparison {
            old_analysis_id: previous.id,
            new_analysis_id: current.id,
            items,
            summary: decode::str_field(&data, "summary"),
            created_at: now_millis(),
        };

        self.reporter.report(ProgressEvent::PhaseFinished {
            phase: Phase::Comparison,
            detail: format!(
                "{} changes, {} aligned pairs",
                comparison.items.len(),
                hints.len()
            ),
        });
        Ok(comparison)
    }

    /// Alignment hints; an embedding failure degrades to no hints.
    async fn similarity_hints(
        &self,
        old_texts: &[String],
        new_texts: &[String],
    ) -> Vec<AlignedPair> {
        match align(self.embedder, old_texts, new_texts, self.threshold).await {
            Ok(pairs) => pairs,
            Err(e) => {
                tracing::warn!(error = %e, "similarity alignment failed; comparing without hints");
                Vec::new()
            }
        }
    }
}

/// `{strengths: [..], weaknesses: [..], opportunities: [..], threats: [..]}`
/// holding factor texts only.
fn factor_texts_json(analysis: &Analysis) -> String {
    let mut obj = serde_json::Map::new();
    for q in Quadrant::ALL {
        let texts: Vec<&str> = analysis.items(q).iter().map(|i| i.text.as_str()).collect();
        obj.insert(q.key().to_string(), json!(texts));
    }
    serde_json::Value::Object(obj).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::models::{now_millis, SwotItem};
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn stored(id: i64, strengths: &[&str]) -> StoredAnalysis {
        StoredAnalysis {
            id,
            analysis: Analysis {
                source_identifier: "doc.md".into(),
                source_text: String::new(),
                context_fingerprint: String::new(),
                strengths: strengths.iter().map(|s| SwotItem::new(*s, "r")).collect(),
                weaknesses: vec![],
                opportunities: vec![],
                threats: vec![],
                strategic_so: vec![],
                strategic_wo: vec![],
                strategic_st: vec![],
                strategic_wt: vec![],
                created_at: now_millis(),
            },
        }
    }

    struct Canned {
        answer: &'static str,
        user: Mutex<String>,
    }

    #[async_trait]
    impl LanguageModel for Canned {
        fn model_name(&self) -> &str {
            "canned"
        }
        async fn complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            *self.user.lock().unwrap() = user.to_string();
            Ok(self.answer.to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl EmbeddingProvider for Broken {
        fn model_name(&self) -> &str {
            "broken"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn embedding_failure_degrades_to_no_hints() {
        let model = Canned {
            answer: r#"{"items": [{"old_text": null, "new_text": "B", "change_type": "new",
                        "reasoning": "appeared", "category": "S"}], "summary": "grew"}"#,
            user: Mutex::new(String::new()),
        };
        let broken = Broken;
        let embedder: &dyn EmbeddingProvider = &broken;
        let pipeline =
            ComparisonPipeline::new(&model, Some(embedder), 0.8, 2, "English", &NoProgress);

        let comparison = pipeline
            .compare(&stored(7, &["A"]), &stored(9, &["A", "B"]))
            .await
            .unwrap();

        assert_eq!(comparison.old_analysis_id, 7);
        assert_eq!(comparison.new_analysis_id, 9);
        assert_eq!(comparison.summary, "grew");
        assert_eq!(comparison.items[0].old_text, None);
        assert_eq!(comparison.items[0].change_type, "new");

        let user = model.user.lock().unwrap();
        assert!(user.contains(r#""strengths":["A"]"#));
        assert!(user.contains(r#""strengths":["A","B"]"#));
        assert!(user.contains("SIMILAR PAIRS (similarity >= 0.8):\n[]"));
    }

    #[test]
    fn factor_json_keeps_quadrant_keys() {
        let v: serde_json::Value =
            serde_json::from_str(&factor_texts_json(&stored(1, &["x"]).analysis)).unwrap();
        assert_eq!(v["strengths"][0], "x");
        assert_eq!(v["threats"], json!([]));
    }
}
