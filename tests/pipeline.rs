//! End-to-end runs of `analyze` with scripted collaborators and a
//! temporary SQLite database.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

use swot_harness::analyze::{analyze_with, AnalyzeArgs, Collaborators};
use swot_harness::config::Config;
use swot_harness::embedding::EmbeddingProvider;
use swot_harness::llm::{LanguageModel, LlmError};
use swot_harness::models::{now_millis, Analysis, ComparisonItem, StrategicPair, SwotItem};
use swot_harness::progress::NoProgress;
use swot_harness::search::WebSearch;
use swot_harness::store::Store;

/// Returns queued answers in order and records the user messages.
struct ScriptedModel {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(answers: Vec<Value>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(|v| v.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers sent verbatim, e.g. prose the JSON extractor cannot parse.
    fn raw(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(user.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Transport("script exhausted".into()))
    }
}

struct CannedSearch {
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl WebSearch for CannedSearch {
    async fn search(&self, query: &str) -> anyhow::Result<String> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(format!("Canned findings for {}", query))
    }
}

/// Fixed vectors per text; unknown texts get a zero vector (similarity 0).
struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    fn model_name(&self) -> &str {
        "table"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| self.table.get(t).cloned().unwrap_or(vec![0.0, 0.0, 0.0]))
            .collect())
    }
}

fn factor_list(prefix: &str, n: usize) -> Value {
    Value::Array(
        (1..=n)
            .map(|i| {
                json!({
                    "text": format!("{} {}", prefix, i),
                    "reasoning": format!("why {} {}", prefix, i),
                })
            })
            .collect(),
    )
}

fn pair_list(prefix: &str, n: usize, with_risk: bool) -> Value {
    Value::Array(
        (1..=n)
            .map(|i| {
                let mut p = json!({
                    "factor1": format!("{} a{}", prefix, i),
                    "factor2": format!("{} b{}", prefix, i),
                    "strategy": format!("{} plan {}", prefix, i),
                });
                if with_risk {
                    p["risk"] = json!(format!("{} risk {}", prefix, i));
                }
                p
            })
            .collect(),
    )
}

/// The four analysis answers: internal, queries, external, pairs.
fn analysis_script(strength_prefix: &str) -> Vec<Value> {
    vec![
        json!({
            "strengths": factor_list(strength_prefix, 5),
            "weaknesses": factor_list("Weakness", 5),
        }),
        json!({
            "queries": ["smb accounting market", "cloud ledger competitors", "tax regulation 2025"],
        }),
        json!({
            "opportunities": factor_list("Opportunity", 5),
            "threats": factor_list("Threat", 5),
        }),
        json!({
            "so": pair_list("SO", 3, false),
            "wo": pair_list("WO", 3, false),
            "st": pair_list("ST", 3, false),
            "wt": pair_list("WT", 4, true),
        }),
    ]
}

fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.db.path = root.join("data/swot.db");
    config.outputs.dir = root.join("outputs");
    config
}

fn write_inputs(root: &Path, source: &str, context: &str) -> AnalyzeArgs {
    let source_file = root.join("q3.md");
    fs::write(&source_file, source).unwrap();
    let context_file = root.join("context.md");
    fs::write(&context_file, context).unwrap();
    AnalyzeArgs {
        source_file,
        context_file,
        comment_file: Some(root.join("pr_comment.md")),
    }
}

#[tokio::test]
async fn analysis_has_scripted_counts_and_report_rows() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let args = write_inputs(tmp.path(), "Revenue grew.", "ACME sells ledgers.");

    let model = ScriptedModel::new(analysis_script("Strength"));
    let search = CannedSearch {
        queries: Mutex::new(Vec::new()),
    };
    let collaborators = Collaborators {
        model: &model,
        search: &search,
        embedder: None,
    };

    let outcome = analyze_with(&config, &args, &collaborators, &NoProgress)
        .await
        .unwrap();
    let a = &outcome.analysis.analysis;

    assert_eq!(a.strengths.len(), 5);
    assert_eq!(a.weaknesses.len(), 5);
    assert_eq!(a.opportunities.len(), 5);
    assert_eq!(a.threats.len(), 5);
    assert_eq!(a.strategic_so.len(), 3);
    assert_eq!(a.strategic_wo.len(), 3);
    assert_eq!(a.strategic_st.len(), 3);
    assert_eq!(a.strategic_wt.len(), 4);
    assert!(a.strategic_wt.iter().all(|p| p.risk.is_some()));
    assert_eq!(a.source_identifier, "q3.md");
    assert!(outcome.comparison.is_none());
    assert!(outcome.comparison_path.is_none());
    assert_eq!(model.remaining(), 0);

    // Search ran once per query, and every result reached the external prompt.
    assert_eq!(search.queries.lock().unwrap().len(), 3);
    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[2]
        .contains("Query: tax regulation 2025\nResult: Canned findings for tax regulation 2025"));

    let report = fs::read_to_string(&outcome.report_path).unwrap();
    for prefix in ["Strength", "Weakness", "Opportunity", "Threat"] {
        for i in 1..=5 {
            let row = format!("| {i} | {p} {i} | why {p} {i} |", i = i, p = prefix);
            assert_eq!(report.matches(&row).count(), 1, "missing row {}", row);
        }
    }
    for i in 1..=4 {
        let row = format!("| WT a{i} | WT b{i} | WT risk {i} | WT plan {i} |", i = i);
        assert!(report.contains(&row), "missing row {}", row);
    }

    let comment = fs::read_to_string(tmp.path().join("pr_comment.md")).unwrap();
    assert!(comment.contains("| 💪 Strengths | 5 |"));
    assert!(!comment.contains("Compared with"));
}

#[tokio::test]
async fn second_run_shares_context_and_stores_the_model_classification() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let search = CannedSearch {
        queries: Mutex::new(Vec::new()),
    };

    // First run.
    let args = write_inputs(tmp.path(), "Version one.", "ACME sells ledgers.");
    let model = ScriptedModel::new(analysis_script("Strength"));
    let collaborators = Collaborators {
        model: &model,
        search: &search,
        embedder: None,
    };
    let first = analyze_with(&config, &args, &collaborators, &NoProgress)
        .await
        .unwrap();

    // Second run: changed source, unchanged context.
    let args = write_inputs(tmp.path(), "Version two.", "ACME sells ledgers.");
    let classification = json!({
        "items": [
            {"old_text": "Strength 1", "new_text": "Asset 1", "change_type": "improved",
             "reasoning": "broader", "category": "S"},
            {"old_text": null, "new_text": "Asset 5", "change_type": "new",
             "reasoning": "appeared", "category": "S"},
            {"old_text": "Strength 4", "new_text": null, "change_type": "lost",
             "reasoning": "dropped", "category": "S"}
        ],
        "summary": "Strengths were reframed."
    });
    let mut script = analysis_script("Asset");
    script.push(classification);
    let model = ScriptedModel::new(script);

    let mut table = HashMap::new();
    table.insert("Strength 1".to_string(), vec![1.0, 0.0, 0.0]);
    table.insert("Asset 1".to_string(), vec![0.95, 0.05, 0.0]);
    let embedder = TableEmbedder { table };
    let embedder: &dyn EmbeddingProvider = &embedder;
    let collaborators = Collaborators {
        model: &model,
        search: &search,
        embedder: Some(embedder),
    };
    let second = analyze_with(&config, &args, &collaborators, &NoProgress)
        .await
        .unwrap();

    let comparison = second.comparison.as_ref().unwrap();
    assert_eq!(comparison.old_analysis_id, first.analysis.id);
    assert_eq!(comparison.new_analysis_id, second.analysis.id);
    assert_eq!(comparison.summary, "Strengths were reframed.");
    assert_eq!(
        comparison.items,
        vec![
            ComparisonItem {
                old_text: Some("Strength 1".into()),
                new_text: Some("Asset 1".into()),
                change_type: "improved".into(),
                reasoning: "broader".into(),
                category: "S".into(),
            },
            ComparisonItem {
                old_text: None,
                new_text: Some("Asset 5".into()),
                change_type: "new".into(),
                reasoning: "appeared".into(),
                category: "S".into(),
            },
            ComparisonItem {
                old_text: Some("Strength 4".into()),
                new_text: None,
                change_type: "lost".into(),
                reasoning: "dropped".into(),
                category: "S".into(),
            },
        ]
    );
    assert!(comparison.items.iter().all(|i| i.is_consistent()));

    // The similarity hint reached the comparison prompt.
    let prompts = model.prompts.lock().unwrap();
    let comparison_prompt = prompts.last().unwrap();
    assert!(comparison_prompt.contains(r#""old_text":"Strength 1","new_text":"Asset 1""#));
    assert!(comparison_prompt
        .contains(r#""strengths":["Asset 1","Asset 2","Asset 3","Asset 4","Asset 5"]"#));

    let store = Store::open(&config.db.path).await.unwrap();
    assert_eq!(store.context_count().await.unwrap(), 1);
    assert_eq!(store.list_analyses(10).await.unwrap().len(), 2);
    let latest = store.latest_analysis().await.unwrap().unwrap();
    assert_eq!(latest.id, second.analysis.id);
    let stored = store
        .comparison_for(second.analysis.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&stored, comparison);
    store.close().await;

    let report = fs::read_to_string(second.comparison_path.as_ref().unwrap()).unwrap();
    assert!(report.contains("Strengths were reframed."));
    assert!(report.contains("| S | - | Asset 5 | appeared |"));
    let comment = fs::read_to_string(tmp.path().join("pr_comment.md")).unwrap();
    assert!(comment.contains("| ❌ Lost | 1 |"));
}

#[tokio::test]
async fn exhausted_retries_abort_without_storing() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let args = write_inputs(tmp.path(), "Revenue grew.", "ACME sells ledgers.");

    let model = ScriptedModel::raw(&[
        "Here are the strengths: a strong brand.",
        "```\nstill not json\n```",
        "{\"strengths\": [",
    ]);
    let search = CannedSearch {
        queries: Mutex::new(Vec::new()),
    };
    let collaborators = Collaborators {
        model: &model,
        search: &search,
        embedder: None,
    };

    let err = analyze_with(&config, &args, &collaborators, &NoProgress)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("malformed"), "error: {:#}", err);

    // Default budget: one attempt plus two retries, all on the first step.
    assert_eq!(model.prompts.lock().unwrap().len(), 3);
    assert_eq!(model.remaining(), 0);
    assert!(search.queries.lock().unwrap().is_empty());

    let store = Store::open(&config.db.path).await.unwrap();
    assert!(store.list_analyses(10).await.unwrap().is_empty());
    assert!(!config.outputs.dir.join("swot_latest.md").exists());
}

#[tokio::test]
async fn stored_analysis_round_trips() {
    let tmp = TempDir::new().unwrap();
    let store = Store::open(&tmp.path().join("swot.db")).await.unwrap();

    let analysis = Analysis {
        source_identifier: "plan.md".into(),
        source_text: "Ünïcode | text\nwith lines".into(),
        context_fingerprint: swot_harness::models::context_fingerprint("ctx"),
        strengths: vec![SwotItem::new("Brand", "Known \"everywhere\"")],
        weaknesses: vec![SwotItem::new("Costs", "")],
        opportunities: vec![],
        threats: vec![SwotItem::new("Regulation", "EU")],
        strategic_so: vec![StrategicPair {
            factor1: "Brand".into(),
            factor2: "Export".into(),
            strategy: "Expand".into(),
            risk: None,
        }],
        strategic_wo: vec![],
        strategic_st: vec![],
        strategic_wt: vec![StrategicPair {
            factor1: "Costs".into(),
            factor2: "Regulation".into(),
            strategy: "Automate".into(),
            risk: Some("Fines".into()),
        }],
        created_at: now_millis(),
    };

    let id = store.save_analysis(&analysis, "ctx").await.unwrap();
    let loaded = store.get_analysis(id).await.unwrap().unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.analysis, analysis);
    assert!(store.get_analysis(id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn latest_prefers_higher_id_on_equal_timestamps() {
    let tmp = TempDir::new().unwrap();
    let store = Store::open(&tmp.path().join("swot.db")).await.unwrap();

    let created_at = now_millis();
    let make = |name: &str| Analysis {
        source_identifier: name.into(),
        source_text: String::new(),
        context_fingerprint: swot_harness::models::context_fingerprint(""),
        strengths: vec![],
        weaknesses: vec![],
        opportunities: vec![],
        threats: vec![],
        strategic_so: vec![],
        strategic_wo: vec![],
        strategic_st: vec![],
        strategic_wt: vec![],
        created_at,
    };
    store.save_analysis(&make("a.md"), "").await.unwrap();
    let second = store.save_analysis(&make("b.md"), "").await.unwrap();

    let latest = store.latest_analysis().await.unwrap().unwrap();
    assert_eq!(latest.id, second);
    assert_eq!(latest.analysis.source_identifier, "b.md");
}
